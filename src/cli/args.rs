//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::AnalysisMode;

#[derive(Parser, Debug)]
#[command(name = "specwatchr")]
#[command(about = "Detect infrasound and ultrasound events in recordings or live capture")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON detection/monitor config file (defaults apply if absent)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze an audio file or every audio file under a directory
    Analyze {
        /// Input file or directory
        input: PathBuf,

        /// Which bands to analyze
        #[arg(short, long, value_enum, default_value_t = ModeArg::Full)]
        mode: ModeArg,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Monitor the microphone feed in real time
    Monitor {
        /// Input device name substring (default input device if omitted)
        #[arg(short, long)]
        device: Option<String>,

        /// Monitoring duration in seconds (runs until Enter if omitted)
        #[arg(short = 't', long)]
        duration: Option<f64>,
    },

    /// List available audio input devices
    Devices,

    /// Generate a synthetic test WAV with out-of-band tones
    Gen {
        /// Output WAV path
        output: PathBuf,

        /// Signal duration in seconds
        #[arg(short = 't', long, default_value_t = 5.0)]
        duration: f64,

        /// Infrasound tone frequency in Hz
        #[arg(long, default_value_t = 10.0)]
        infra_hz: f64,

        /// Ultrasound tone frequency in Hz
        #[arg(long, default_value_t = 25_000.0)]
        ultra_hz: f64,

        /// Uniform noise amplitude
        #[arg(long, default_value_t = 0.01)]
        noise: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Infrasound,
    Ultrasound,
    Full,
}

impl From<ModeArg> for AnalysisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Infrasound => AnalysisMode::Infrasound,
            ModeArg::Ultrasound => AnalysisMode::Ultrasound,
            ModeArg::Full => AnalysisMode::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
    Csv,
}
