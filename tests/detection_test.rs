// tests/detection_test.rs
//
// End-to-end detection scenarios over synthetic buffers: a pure tone in
// one band must yield exactly one event in that band and none in the
// other, with the reported frequency within a spectral bin of the truth.

use specwatchr::config::DetectionConfig;
use specwatchr::core::{AnalysisMode, AudioAnalyzer, Band};
use specwatchr::testgen::SignalBuilder;

#[test]
fn infrasound_tone_yields_exactly_one_event() {
    let config = DetectionConfig::default();
    assert_eq!(config.sample_rate, 96_000);

    // 3 s of a 10 Hz tone at 0.7 plus low-amplitude noise
    let samples = SignalBuilder::new(config.sample_rate, 3.0)
        .tone(10.0, 0.7)
        .noise(1e-6)
        .build();

    let mut analyzer = AudioAnalyzer::with_config(config).unwrap();
    let report = analyzer.analyze_buffer(&samples, "infra_tone");

    let infrasound: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.band == Band::Infrasound)
        .collect();
    let ultrasound: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.band == Band::Ultrasound)
        .collect();

    assert_eq!(infrasound.len(), 1, "expected exactly one infrasound event");
    assert!(ultrasound.is_empty(), "no ultrasound should register");
    assert!(
        (infrasound[0].frequency_hz - 10.0).abs() <= 0.5,
        "frequency off: {}",
        infrasound[0].frequency_hz
    );
    assert!(infrasound[0].magnitude_db > -40.0);
}

#[test]
fn ultrasound_tone_yields_exactly_one_event() {
    let config = DetectionConfig::default();

    let samples = SignalBuilder::new(config.sample_rate, 3.0)
        .tone(28_000.0, 0.7)
        .noise(1e-6)
        .build();

    let mut analyzer = AudioAnalyzer::with_config(config).unwrap();
    let report = analyzer.analyze_buffer(&samples, "ultra_tone");

    let infrasound = report
        .events
        .iter()
        .filter(|e| e.band == Band::Infrasound)
        .count();
    let ultrasound: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.band == Band::Ultrasound)
        .collect();

    assert_eq!(infrasound, 0, "no infrasound should register");
    assert_eq!(ultrasound.len(), 1, "expected exactly one ultrasound event");
    assert!(
        (ultrasound[0].frequency_hz - 28_000.0).abs() <= 1.0,
        "frequency off: {}",
        ultrasound[0].frequency_hz
    );
}

#[test]
fn tone_frequency_is_within_one_bin() {
    // Off-bin tone: 10.2 Hz with 1/3 Hz resolution over 3 s
    let config = DetectionConfig::default();
    let bin_width = 1.0 / 3.0;

    let samples = SignalBuilder::new(config.sample_rate, 3.0)
        .tone(10.2, 0.7)
        .build();

    let mut analyzer = AudioAnalyzer::builder()
        .config(config)
        .mode(AnalysisMode::Infrasound)
        .build()
        .unwrap();
    let report = analyzer.analyze_buffer(&samples, "offbin");

    assert_eq!(report.total_events, 1);
    assert!((report.events[0].frequency_hz - 10.2).abs() <= bin_width);
}

#[test]
fn empty_buffer_reports_no_events() {
    let mut analyzer = AudioAnalyzer::new().unwrap();
    let report = analyzer.analyze_buffer(&[], "empty");
    assert_eq!(report.total_events, 0);
    assert!(report.events.is_empty());
}

#[test]
fn silence_reports_no_events() {
    let config = DetectionConfig::default();
    let silence = vec![0.0; config.sample_rate as usize];
    let mut analyzer = AudioAnalyzer::with_config(config).unwrap();
    let report = analyzer.analyze_buffer(&silence, "silence");
    assert_eq!(report.total_events, 0);
}

#[test]
fn events_are_ordered_band_then_frequency() {
    let config = DetectionConfig::default();
    // Two ultrasound tones far enough apart to both survive suppression
    // (separation is 0.05 s * 96000 = 4800 bins = 1600 Hz at 1/3 Hz bins)
    let samples = SignalBuilder::new(config.sample_rate, 3.0)
        .tone(10.0, 0.5)
        .tone(24_000.0, 0.5)
        .tone(30_000.0, 0.5)
        .build();

    let mut analyzer = AudioAnalyzer::with_config(config).unwrap();
    let report = analyzer.analyze_buffer(&samples, "ordering");

    assert!(report.total_events >= 3);
    let bands: Vec<Band> = report.events.iter().map(|e| e.band).collect();
    let first_ultra = bands
        .iter()
        .position(|b| *b == Band::Ultrasound)
        .expect("ultrasound events expected");
    assert!(bands[..first_ultra].iter().all(|b| *b == Band::Infrasound));
    assert!(bands[first_ultra..].iter().all(|b| *b == Band::Ultrasound));

    let ultra_freqs: Vec<f64> = report
        .events
        .iter()
        .filter(|e| e.band == Band::Ultrasound)
        .map(|e| e.frequency_hz)
        .collect();
    assert!(ultra_freqs.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn offline_events_carry_no_timestamp() {
    let config = DetectionConfig::default();
    let samples = SignalBuilder::new(config.sample_rate, 2.0)
        .tone(12.0, 0.6)
        .build();
    let mut analyzer = AudioAnalyzer::with_config(config).unwrap();
    let report = analyzer.analyze_buffer(&samples, "stampless");
    assert!(!report.events.is_empty());
    assert!(report.events.iter().all(|e| e.timestamp.is_none()));
}
