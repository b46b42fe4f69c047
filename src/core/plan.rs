use crate::config::toml_config::{BootstrapConfig, StepConfig};
use crate::domain::model::{CommandSpec, FailurePolicy, StepKind};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// 觀察到的三種部署腳本，各自對應一組預設策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// 安裝、建立目錄、collectstatic (失敗時繼續)
    Build,
    /// Build 再加上 migrate (失敗時繼續)
    Release,
    /// collectstatic 失敗即中止
    Strict,
}

impl Variant {
    /// 依部署環境決定：Railway 或 DJANGO_ENV=production 時使用 Release。
    /// `[environment]` 的值優先於父行程，與子行程看到的環境一致
    pub fn detect(overrides: &HashMap<String, String>) -> Self {
        Self::detect_from(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        })
    }

    pub fn detect_from<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_railway = lookup("RAILWAY_ENVIRONMENT").is_some();
        let is_production = lookup("DJANGO_ENV").as_deref() == Some("production");

        if is_railway || is_production {
            Variant::Release
        } else {
            Variant::Build
        }
    }

    fn collectstatic_policy(self) -> FailurePolicy {
        match self {
            Variant::Strict => FailurePolicy::Abort,
            Variant::Build | Variant::Release => FailurePolicy::Continue,
        }
    }

    fn runs_migrations(self) -> bool {
        matches!(self, Variant::Release)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Build => f.write_str("build"),
            Variant::Release => f.write_str("release"),
            Variant::Strict => f.write_str("strict"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Run(CommandSpec),
    EnsureDirectories(Vec<PathBuf>),
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Run(command) => write!(f, "{}", command),
            StepAction::EnsureDirectories(paths) => {
                let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "mkdir -p {}", joined.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub kind: StepKind,
    pub action: StepAction,
    pub policy: FailurePolicy,
    pub fallback_message: String,
}

impl PlannedStep {
    /// 目錄步驟在非預設路徑時列出實際路徑
    pub fn progress_message(&self) -> String {
        match &self.action {
            StepAction::EnsureDirectories(paths) if !is_default_directories(paths) => {
                let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                format!("Creating directories {}...", joined.join(", "))
            }
            _ => self.kind.progress_message(),
        }
    }
}

fn is_default_directories(paths: &[PathBuf]) -> bool {
    paths.len() == 2 && paths[0] == Path::new("staticfiles") && paths[1] == Path::new("media")
}

/// 依序執行的步驟清單
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    pub variant: Variant,
    pub working_dir: PathBuf,
    pub settings_module: Option<String>,
    pub steps: Vec<PlannedStep>,
}

impl BootstrapPlan {
    pub fn from_config(config: &BootstrapConfig) -> Result<Self> {
        config.validate()?;

        let variant = match config.bootstrap.variant {
            Some(variant) => variant,
            None => {
                let detected = Variant::detect(&config.environment());
                tracing::info!("No variant configured, detected '{}'", detected);
                detected
            }
        };

        let mut steps = Vec::new();

        let install_default = CommandSpec::new("pip", &["install", "-r", config.manifest()]);
        steps.push(PlannedStep {
            kind: StepKind::InstallDependencies,
            action: StepAction::Run(command_or(&config.steps.install, install_default)),
            policy: FailurePolicy::Abort,
            fallback_message: String::new(),
        });

        steps.push(PlannedStep {
            kind: StepKind::ProvisionDirectories,
            action: StepAction::EnsureDirectories(
                config.directory_paths().into_iter().map(PathBuf::from).collect(),
            ),
            policy: FailurePolicy::Abort,
            fallback_message: String::new(),
        });

        if config.steps.collectstatic.enabled.unwrap_or(true) {
            let default = manage_command(config, "collectstatic", &["--noinput", "--clear"]);
            steps.push(framework_step(
                StepKind::CollectStatic,
                &config.steps.collectstatic,
                default,
                variant.collectstatic_policy(),
            ));
        }

        if config
            .steps
            .migrate
            .enabled
            .unwrap_or_else(|| variant.runs_migrations())
        {
            let default = manage_command(config, "migrate", &["--noinput"]);
            steps.push(framework_step(
                StepKind::Migrate,
                &config.steps.migrate,
                default,
                FailurePolicy::Continue,
            ));
        }

        for management in &config.management {
            let kind = StepKind::ManagementCommand(management.name.clone());
            let args: Vec<&str> = management.args.iter().map(String::as_str).collect();
            let fallback_message = management
                .fallback_message
                .clone()
                .unwrap_or_else(|| kind.default_fallback_message());
            steps.push(PlannedStep {
                action: StepAction::Run(manage_command(config, &management.name, &args)),
                policy: management.on_failure.unwrap_or(FailurePolicy::Continue),
                fallback_message,
                kind,
            });
        }

        Ok(Self {
            variant,
            working_dir: config.working_dir(),
            settings_module: config.python.settings_module.clone(),
            steps,
        })
    }

    pub fn step(&self, kind: &StepKind) -> Option<&PlannedStep> {
        self.steps.iter().find(|step| &step.kind == kind)
    }
}

fn manage_command(config: &BootstrapConfig, subcommand: &str, flags: &[&str]) -> CommandSpec {
    let mut args = vec![config.manage_script(), subcommand];
    args.extend_from_slice(flags);
    CommandSpec::new(config.interpreter(), &args)
}

fn command_or(step: &StepConfig, default: CommandSpec) -> CommandSpec {
    step.command
        .as_deref()
        .and_then(CommandSpec::from_argv)
        .unwrap_or(default)
}

fn framework_step(
    kind: StepKind,
    step: &StepConfig,
    default: CommandSpec,
    default_policy: FailurePolicy,
) -> PlannedStep {
    let fallback_message = step
        .fallback_message
        .clone()
        .unwrap_or_else(|| kind.default_fallback_message());
    PlannedStep {
        action: StepAction::Run(command_or(step, default)),
        policy: step.on_failure.unwrap_or(default_policy),
        fallback_message,
        kind,
    }
}
