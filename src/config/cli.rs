use crate::config::toml_config::BootstrapConfig;
use crate::core::plan::Variant;
use crate::domain::model::FailurePolicy;
use crate::utils::logger::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "deploy-bootstrap")]
#[command(about = "Bring a freshly checked out web application to a ready-to-serve state")]
pub struct CliArgs {
    /// Path to TOML configuration file (default: <workdir>/bootstrap.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the steps run in
    #[arg(short = 'C', long)]
    pub workdir: Option<PathBuf>,

    /// Step preset; detected from the environment when omitted
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Run database migrations after collecting static files
    #[arg(long, conflicts_with = "no_migrate")]
    pub migrate: bool,

    /// Never run database migrations
    #[arg(long)]
    pub no_migrate: bool,

    /// Abort when static collection fails
    #[arg(long)]
    pub strict_static: bool,

    /// Dependency manifest passed to the installer
    #[arg(long)]
    pub manifest: Option<String>,

    /// Python interpreter used for manage.py
    #[arg(long)]
    pub python: Option<String>,

    /// Print the plan without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl CliArgs {
    /// 設定檔搜尋位置所用的目錄
    pub fn base_dir(&self) -> PathBuf {
        self.workdir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// 命令列設定覆蓋設定檔
    pub fn apply_overrides(&self, config: &mut BootstrapConfig) {
        if let Some(workdir) = &self.workdir {
            config.bootstrap.working_dir = Some(workdir.display().to_string());
        }
        if let Some(variant) = self.variant {
            tracing::info!("Variant overridden to: {}", variant);
            config.bootstrap.variant = Some(variant);
        }
        if self.migrate {
            config.steps.migrate.enabled = Some(true);
        }
        if self.no_migrate {
            config.steps.migrate.enabled = Some(false);
        }
        if self.strict_static {
            config.steps.collectstatic.on_failure = Some(FailurePolicy::Abort);
        }
        if let Some(manifest) = &self.manifest {
            config.python.manifest = Some(manifest.clone());
        }
        if let Some(python) = &self.python {
            config.python.interpreter = Some(python.clone());
        }
    }
}
