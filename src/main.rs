// src/main.rs
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::error;
use rayon::prelude::*;

use specwatchr::cli::{report, Cli, Command, FormatArg, ModeArg};
use specwatchr::config::MonitorConfig;
use specwatchr::core::{collect_audio_files, AnalysisReport, AudioAnalyzer};
use specwatchr::streaming::{list_input_devices, CpalSource, MonitorPipeline};
use specwatchr::testgen::{write_wav, SignalBuilder};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze {
            input,
            mode,
            format,
            output,
        } => analyze(&input, mode, format, output.as_deref(), config, cli.verbose),
        Command::Monitor { device, duration } => monitor(device, duration, config),
        Command::Devices => devices(),
        Command::Gen {
            output,
            duration,
            infra_hz,
            ultra_hz,
            noise,
        } => gen(&output, duration, infra_hz, ultra_hz, noise, &config),
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let Some(path) = path else {
        return Ok(MonitorConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: MonitorConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn analyze(
    input: &Path,
    mode: ModeArg,
    format: FormatArg,
    output: Option<&Path>,
    config: MonitorConfig,
    verbose: bool,
) -> Result<()> {
    let files = collect_audio_files(input);
    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }

    if format == FormatArg::Text {
        println!("Found {} audio file(s)\n", files.len());
    }

    let bar = ProgressBar::new(files.len() as u64).with_style(
        ProgressStyle::with_template("{wide_bar} {pos}/{len} {msg}").unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    if files.len() == 1 || format != FormatArg::Text {
        bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let reports: Vec<AnalysisReport> = files
        .par_iter()
        .progress_with(bar)
        .filter_map(|path| {
            let analyzed = AudioAnalyzer::builder()
                .config(config.detection.clone())
                .mode(mode.into())
                .build()
                .and_then(|mut analyzer| analyzer.analyze_file(path));
            match analyzed {
                Ok(report) => Some(report),
                Err(e) => {
                    // Per-file failures are reported, never fatal to the batch
                    error!("{}: {e}", path.display());
                    None
                }
            }
        })
        .collect();

    let rendered = report::render_reports(&reports, format, verbose)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    let total: usize = reports.iter().map(|r| r.total_events).sum();
    if format == FormatArg::Text {
        println!("\n{} file(s) analyzed, {} event(s) total", reports.len(), total);
    }
    Ok(())
}

fn monitor(device: Option<String>, duration: Option<f64>, config: MonitorConfig) -> Result<()> {
    let sample_rate = config.detection.sample_rate;
    let mut pipeline = MonitorPipeline::new(config)?;

    pipeline.register_callback(Box::new(|event| {
        let stamp = event
            .timestamp
            .map(|t| t.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_default();
        println!(
            "[{stamp}] {}: {:.2} Hz @ {:.1} dB",
            event.band.to_string().to_uppercase(),
            event.frequency_hz,
            event.magnitude_db
        );
    }));

    let source = match device {
        Some(name) => CpalSource::by_name(name),
        None => CpalSource::default_device(),
    };

    println!("{}", "REAL-TIME MONITORING".bold());
    println!("Sample rate: {sample_rate} Hz (Nyquist {} Hz)", sample_rate / 2);

    let summary = match duration {
        Some(secs) => pipeline.run_for(Box::new(source), Duration::from_secs_f64(secs))?,
        None => {
            pipeline.start(Box::new(source), None)?;
            println!("Monitoring... press Enter to stop");
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            pipeline.stop()?
        }
    };

    print!("{}", report::render_summary(&summary));
    Ok(())
}

fn devices() -> Result<()> {
    let devices = list_input_devices()?;
    if devices.is_empty() {
        println!("{}", "No input devices found".yellow());
        return Ok(());
    }
    println!("Available input devices:");
    for (i, device) in devices.iter().enumerate() {
        println!(
            "  [{i}] {} ({} ch, {} Hz default)",
            device.name, device.max_input_channels, device.default_sample_rate
        );
    }
    Ok(())
}

fn gen(
    output: &PathBuf,
    duration: f64,
    infra_hz: f64,
    ultra_hz: f64,
    noise: f64,
    config: &MonitorConfig,
) -> Result<()> {
    let sample_rate = config.detection.sample_rate;
    let samples = SignalBuilder::new(sample_rate, duration)
        .tone(infra_hz, 0.5)
        .tone(ultra_hz, 0.3)
        .noise(noise)
        .build();
    write_wav(output, &samples, sample_rate)?;
    println!(
        "Wrote {:.1}s test signal ({infra_hz} Hz + {ultra_hz} Hz) to {}",
        duration,
        output.display()
    );
    Ok(())
}
