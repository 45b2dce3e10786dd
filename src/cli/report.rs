//! Report rendering for analysis results and monitoring summaries

use anyhow::Result;

use super::args::FormatArg;
use crate::core::AnalysisReport;
use crate::streaming::MonitorSummary;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const MAGENTA: &str = "\x1b[35m";

/// Render a batch of per-file reports in the requested format.
pub fn render_reports(reports: &[AnalysisReport], format: FormatArg, verbose: bool) -> Result<String> {
    match format {
        FormatArg::Text => Ok(reports
            .iter()
            .map(|r| format_text(r, verbose))
            .collect::<Vec<_>>()
            .join("\n")),
        FormatArg::Json => Ok(serde_json::to_string_pretty(reports)?),
        FormatArg::Csv => Ok(format_csv(reports)),
    }
}

fn format_text(report: &AnalysisReport, verbose: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{BOLD}{}{RESET} {DIM}({:.2}s @ {} Hz){RESET}\n",
        report.source, report.duration_seconds, report.sample_rate
    ));

    if report.events.is_empty() {
        out.push_str("  no out-of-band events detected\n");
        return out;
    }

    out.push_str(&format!("  {} event(s):\n", report.total_events));
    for event in &report.events {
        let band_color = match event.band {
            crate::core::Band::Infrasound => MAGENTA,
            crate::core::Band::Ultrasound => CYAN,
        };
        out.push_str(&format!(
            "    {band_color}{:<10}{RESET} {:>10.2} Hz  {:>7.1} dB",
            event.band.label(),
            event.frequency_hz,
            event.magnitude_db
        ));
        if verbose {
            if let Some(ts) = event.timestamp {
                out.push_str(&format!("  {DIM}{}{RESET}", ts.format("%H:%M:%S%.3f")));
            }
        }
        out.push('\n');
    }

    out
}

fn format_csv(reports: &[AnalysisReport]) -> String {
    let mut out = String::from("source,band,frequency_hz,magnitude_db,timestamp\n");
    for report in reports {
        for event in &report.events {
            let timestamp = event
                .timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            out.push_str(&format!(
                "{},{},{:.4},{:.2},{}\n",
                csv_escape(&report.source),
                event.band.label(),
                event.frequency_hz,
                event.magnitude_db,
                timestamp
            ));
        }
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render the end-of-run monitoring summary.
pub fn render_summary(summary: &MonitorSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{BOLD}monitoring stopped{RESET}\n"));
    out.push_str(&format!(
        "  total events:      {}\n  infrasound:        {}\n  ultrasound:        {}\n",
        summary.total_events, summary.infrasound_events, summary.ultrasound_events
    ));
    if summary.overruns > 0 {
        out.push_str(&format!("  queue overruns:    {}\n", summary.overruns));
    }
    if summary.callback_failures > 0 {
        out.push_str(&format!("  callback failures: {}\n", summary.callback_failures));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Band, SpectralEvent};

    fn report() -> AnalysisReport {
        AnalysisReport {
            source: "sample.wav".into(),
            duration_seconds: 3.0,
            sample_rate: 96_000,
            events: vec![SpectralEvent {
                band: Band::Infrasound,
                frequency_hz: 10.0,
                magnitude_db: -12.5,
                source: "sample.wav".into(),
                timestamp: None,
            }],
            total_events: 1,
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_event() {
        let csv = render_reports(&[report()], FormatArg::Csv, false).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("source,band"));
        assert!(lines[1].starts_with("sample.wav,infrasound,10.0000"));
    }

    #[test]
    fn json_round_trips() {
        let json = render_reports(&[report()], FormatArg::Json, false).unwrap();
        let back: Vec<AnalysisReport> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].total_events, 1);
    }

    #[test]
    fn csv_fields_with_commas_are_quoted() {
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("plain"), "plain");
    }

    #[test]
    fn text_mentions_the_band() {
        let text = render_reports(&[report()], FormatArg::Text, false).unwrap();
        assert!(text.contains("infrasound"));
        assert!(text.contains("10.00 Hz"));
    }
}
