use crate::adapters::{LocalWorkspace, ProcessRunner};
use crate::config::toml_config::BootstrapConfig;
use crate::core::plan::{BootstrapPlan, PlannedStep, StepAction};
use crate::domain::model::{BootstrapReport, FailurePolicy, StepOutcome, StepRecord};
use crate::domain::ports::{CommandRunner, Workspace};
use crate::utils::error::{BootstrapError, Result};
use std::time::Instant;

pub const START_MESSAGE: &str = "Starting deployment bootstrap...";
pub const COMPLETE_MESSAGE: &str = "Deployment bootstrap complete.";
pub const DRY_RUN_COMPLETE_MESSAGE: &str = "Dry run complete, no commands were executed.";

pub struct Bootstrapper<R: CommandRunner, W: Workspace> {
    plan: BootstrapPlan,
    runner: R,
    workspace: W,
    dry_run: bool,
}

impl Bootstrapper<ProcessRunner, LocalWorkspace> {
    /// 以真實子行程與本機檔案系統建立
    pub fn from_config(config: &BootstrapConfig) -> Result<Self> {
        let plan = BootstrapPlan::from_config(config)?;

        let mut runner = ProcessRunner::new(plan.working_dir.clone()).with_env(config.environment());
        if let Some(settings_module) = &plan.settings_module {
            runner = runner.with_default_env("DJANGO_SETTINGS_MODULE", settings_module);
        }
        let workspace = LocalWorkspace::new(plan.working_dir.clone());

        Ok(Self::new(plan, runner, workspace))
    }
}

impl<R: CommandRunner, W: Workspace> Bootstrapper<R, W> {
    pub fn new(plan: BootstrapPlan, runner: R, workspace: W) -> Self {
        Self {
            plan,
            runner,
            workspace,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn plan(&self) -> &BootstrapPlan {
        &self.plan
    }

    pub async fn run(&self) -> Result<BootstrapReport> {
        let (report, result) = self.run_to_report().await;
        result.map(|_| report)
    }

    /// 執行計畫並一律回傳報告；中止時報告包含失敗的步驟
    pub async fn run_to_report(&self) -> (BootstrapReport, Result<()>) {
        let mut report = BootstrapReport::new(self.plan.variant.to_string(), self.dry_run);

        tracing::info!(
            "Bootstrapping {} (variant: {}, {} steps)",
            self.workspace.root().display(),
            self.plan.variant,
            self.plan.steps.len()
        );
        emit(&mut report, START_MESSAGE);

        for step in &self.plan.steps {
            emit(&mut report, &step.progress_message());

            let started = Instant::now();
            let outcome = if self.dry_run {
                emit(
                    &mut report,
                    &format!("  would run: {} (on failure: {})", step.action, step.policy),
                );
                StepOutcome::Skipped
            } else {
                match self.execute(step, &mut report).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        report.steps.push(StepRecord {
                            step: step.kind.clone(),
                            outcome: StepOutcome::Failed {
                                reason: err.to_string(),
                            },
                            duration_ms: started.elapsed().as_millis() as u64,
                        });
                        return (report, Err(err));
                    }
                }
            };

            report.steps.push(StepRecord {
                step: step.kind.clone(),
                outcome,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        if self.dry_run {
            emit(&mut report, DRY_RUN_COMPLETE_MESSAGE);
        } else {
            emit(&mut report, COMPLETE_MESSAGE);
        }

        let suppressed = report.suppressed_steps().count();
        if suppressed > 0 {
            tracing::warn!("Bootstrap finished with {} suppressed failure(s)", suppressed);
        }

        (report, Ok(()))
    }

    async fn execute(&self, step: &PlannedStep, report: &mut BootstrapReport) -> Result<StepOutcome> {
        let command = match &step.action {
            StepAction::EnsureDirectories(paths) => {
                for path in paths {
                    self.workspace.ensure_dir(path).await?;
                }
                return Ok(StepOutcome::Succeeded);
            }
            StepAction::Run(command) => command,
        };

        // 無法啟動與非零退出同樣依策略處理
        let failure = match self.runner.run(command).await {
            Ok(status) if status.success => return Ok(StepOutcome::Succeeded),
            Ok(status) => BootstrapError::StepFailedError {
                step: step.kind.name().to_string(),
                command: command.to_string(),
                code: status.code,
            },
            Err(err @ BootstrapError::SpawnError { .. }) => err,
            Err(err) => return Err(err),
        };

        match step.policy {
            FailurePolicy::Abort => {
                tracing::error!("Step '{}' failed: {}", step.kind, failure);
                Err(failure)
            }
            FailurePolicy::Continue => {
                tracing::warn!("Step '{}' failed, continuing: {}", step.kind, failure);
                emit_warning(report, &step.fallback_message);
                Ok(StepOutcome::Suppressed {
                    reason: failure.to_string(),
                })
            }
        }
    }
}

fn emit(report: &mut BootstrapReport, message: &str) {
    println!("{}", message);
    tracing::debug!("{}", message);
    report.messages.push(message.to_string());
}

fn emit_warning(report: &mut BootstrapReport, message: &str) {
    println!("{}", message);
    tracing::debug!("{}", message);
    report.messages.push(message.to_string());
}
