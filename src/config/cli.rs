use crate::config::toml_config::TomlConfig;
use crate::domain::model::RecordingMode;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "sbalance")]
#[command(about = "Log weights and flow rates from an analytical balance over a serial line")]
#[command(version)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "sbalance.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Recording mode (hydro or log)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<RecordingMode>,

    /// Balance model: Metler, Denver or Dummy
    #[arg(long)]
    pub model: Option<String>,

    /// Serial port path
    #[arg(long)]
    pub port: Option<String>,

    #[arg(long)]
    pub baud: Option<u32>,

    /// Seconds between weight requests
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Number of polls spanned by the flow calculation
    #[arg(short, long)]
    pub flow_interval: Option<usize>,

    /// Number of flow values in the running average
    #[arg(short, long)]
    pub average: Option<usize>,

    /// Label written in log mode
    #[arg(long)]
    pub tag: Option<String>,

    /// Directory for the result log file
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Show the effective configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Write the effective configuration back to the config file on exit
    #[arg(long)]
    pub save_config: bool,
}

fn parse_mode(value: &str) -> Result<RecordingMode, String> {
    match value {
        "hydro" => Ok(RecordingMode::Hydro),
        "log" => Ok(RecordingMode::Log),
        other => Err(format!("unknown mode '{}', expected 'hydro' or 'log'", other)),
    }
}

impl CliArgs {
    /// 套用命令列覆蓋設定
    pub fn apply_to(&self, config: &mut TomlConfig) {
        if let Some(mode) = self.mode {
            config.main.mode = mode;
        }
        if let Some(model) = &self.model {
            config.main.model = model.clone();
        }
        if let Some(port) = &self.port {
            config.main.comport = port.clone();
        }
        if let Some(baud) = self.baud {
            config.main.baud = baud;
        }
        if let Some(interval) = self.interval {
            config.main.update_interval = interval;
        }
        if let Some(flow_interval) = self.flow_interval {
            config.hydro.flow_interval = flow_interval;
        }
        if let Some(average) = self.average {
            config.hydro.average_n = average;
        }
        if let Some(tag) = &self.tag {
            config.main.tag = tag.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.main.log_dir = log_dir.clone();
        }
    }
}
