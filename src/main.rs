use clap::Parser;
use sbalance::adapters::keyboard;
use sbalance::domain::model::Vendor;
use sbalance::domain::ports::ConfigProvider;
use sbalance::utils::error::ErrorSeverity;
use sbalance::utils::{logger, validation::Validate};
use sbalance::{BalanceError, CliArgs, RecordLog, SerialTransport, Session, SystemClock, TomlConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting sbalance {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match TomlConfig::from_file_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    args.apply_to(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let vendor = config.resolve_vendor();
    display_config_summary(&config, vendor, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - not opening the balance");
        return Ok(());
    }

    if let Err(e) = run_session(&config).await {
        tracing::error!(
            "❌ Session failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    if args.save_config {
        config.save(&args.config)?;
        tracing::info!("💾 Configuration saved to {}", args.config);
    }

    Ok(())
}

async fn run_session(config: &TomlConfig) -> Result<(), BalanceError> {
    let sink = RecordLog::create_in(&config.main.log_dir, true)?;
    tracing::info!("📝 Logging results to {}", sink.path().display());

    let transport = SerialTransport::new(config.port(), config.baud());
    let session = Session::new(transport, sink, Arc::new(SystemClock), config)?;

    let commands = keyboard::spawn_stdin_listener();
    tracing::info!("⌨️  Commands: <enter> log current value, c start, s stop, q quit");

    session.run(commands).await?;
    Ok(())
}

fn display_config_summary(config: &TomlConfig, vendor: Vendor, args: &CliArgs) {
    println!("📋 Configuration Summary:");
    println!("  Mode: {}", config.mode());
    if vendor.to_string() == config.main.model.trim() {
        println!("  Model: {}", vendor);
    } else {
        println!("  Model: {} (unknown '{}')", vendor, config.main.model);
    }
    println!("  Port: {} @ {} baud", config.port(), config.baud());
    println!("  Update Interval: {} s", config.main.update_interval);
    println!("  Flow Interval: {} polls", config.flow_window());
    println!("  Running Average N: {}", config.average_window());
    println!("  Log Directory: {}", config.main.log_dir);

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
