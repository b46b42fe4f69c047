use anyhow::Context;
use clap::Parser;
use deploy_bootstrap::domain::model::BootstrapReport;
use deploy_bootstrap::utils::logger;
use deploy_bootstrap::{
    BootstrapConfig, BootstrapError, Bootstrapper, CliArgs, LocalWorkspace, ProcessRunner,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose, args.log_format);

    tracing::info!("Starting deploy-bootstrap");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    let bootstrapper = match prepare(&args) {
        Ok(bootstrapper) => bootstrapper,
        Err(e) => exit_with(&e),
    };

    let (report, result) = bootstrapper.run_to_report().await;

    // 失敗的執行同樣寫出報告
    let report_written = match &args.report {
        Some(path) => match write_report(path, &report) {
            Ok(()) => {
                tracing::info!("Report written to {}", path.display());
                true
            }
            Err(e) => {
                tracing::error!("{:#}", e);
                eprintln!("❌ {:#}", e);
                false
            }
        },
        None => true,
    };

    if let Err(e) = result {
        exit_with(&e);
    }
    if !report_written {
        std::process::exit(3);
    }
}

fn prepare(args: &CliArgs) -> Result<Bootstrapper<ProcessRunner, LocalWorkspace>, BootstrapError> {
    let mut config = BootstrapConfig::load(args.config.as_deref(), &args.base_dir())?;
    args.apply_overrides(&mut config);

    // 建立計畫時會驗證配置
    let bootstrapper = Bootstrapper::from_config(&config)?.with_dry_run(args.dry_run);
    if args.dry_run {
        tracing::info!("DRY RUN MODE - no commands will be executed");
    }

    Ok(bootstrapper)
}

fn exit_with(e: &BootstrapError) -> ! {
    tracing::error!("Bootstrap failed: {} (Severity: {:?})", e, e.severity());
    eprintln!("❌ {}", e);
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn write_report(path: &Path, report: &BootstrapReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to encode report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
