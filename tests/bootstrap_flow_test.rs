use async_trait::async_trait;
use deploy_bootstrap::core::bootstrap::{COMPLETE_MESSAGE, START_MESSAGE};
use deploy_bootstrap::domain::model::{CommandSpec, CommandStatus, StepKind, StepOutcome};
use deploy_bootstrap::domain::ports::CommandRunner;
use deploy_bootstrap::{
    BootstrapConfig, BootstrapError, BootstrapPlan, Bootstrapper, LocalWorkspace, Result,
    Variant,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 依子命令名稱決定成功或失敗的假執行器
#[derive(Clone, Default)]
struct ScriptedRunner {
    failing: Vec<String>,
    missing: Vec<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    fn failing_on(steps: &[&str]) -> Self {
        Self {
            failing: steps.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// 模擬找不到執行檔
    fn missing_program_for(steps: &[&str]) -> Self {
        Self {
            missing: steps.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    fn matches(needles: &[String], command: &CommandSpec) -> bool {
        needles
            .iter()
            .any(|needle| command.program == *needle || command.args.iter().any(|a| a == needle))
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandStatus> {
        let rendered = command.to_string();
        self.calls.lock().unwrap().push(rendered.clone());

        if Self::matches(&self.missing, command) {
            return Err(BootstrapError::SpawnError {
                command: rendered,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            });
        }

        let fails = Self::matches(&self.failing, command);
        Ok(CommandStatus::from_code(if fails { 1 } else { 0 }))
    }
}

fn plan(variant: Variant) -> BootstrapPlan {
    let mut config = BootstrapConfig::default();
    config.bootstrap.variant = Some(variant);
    BootstrapPlan::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_successful_build_emits_bracketed_progress() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::failing_on(&[]);

    let report = Bootstrapper::new(plan(Variant::Build), runner.clone(), LocalWorkspace::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(
        report.messages,
        vec![
            START_MESSAGE.to_string(),
            "Installing dependencies...".to_string(),
            "Creating static and media directories...".to_string(),
            "Collecting static files...".to_string(),
            COMPLETE_MESSAGE.to_string(),
        ]
    );
    assert_eq!(
        runner.calls(),
        vec![
            "pip install -r requirements.txt".to_string(),
            "python manage.py collectstatic --noinput --clear".to_string(),
        ]
    );
    assert!(dir.path().join("staticfiles").is_dir());
    assert!(dir.path().join("media").is_dir());
    assert!(report
        .steps
        .iter()
        .all(|record| record.outcome == StepOutcome::Succeeded));
}

#[tokio::test]
async fn test_collectstatic_failure_is_suppressed() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::failing_on(&["collectstatic"]);

    let report = Bootstrapper::new(plan(Variant::Build), runner, LocalWorkspace::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert!(report
        .messages
        .contains(&"Static collection failed, continuing build...".to_string()));
    assert_eq!(report.messages.last().unwrap(), COMPLETE_MESSAGE);
    assert!(matches!(
        report.outcome_of(&StepKind::CollectStatic),
        Some(StepOutcome::Suppressed { .. })
    ));
}

#[tokio::test]
async fn test_install_failure_stops_before_directories() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::failing_on(&["pip"]);

    let err = Bootstrapper::new(plan(Variant::Release), runner.clone(), LocalWorkspace::new(dir.path()))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::StepFailedError { ref step, code: Some(1), .. } if step == "install"
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(runner.calls().len(), 1);
    assert!(!dir.path().join("staticfiles").exists());
    assert!(!dir.path().join("media").exists());
}

#[tokio::test]
async fn test_migration_failure_is_suppressed() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::failing_on(&["migrate"]);

    let report = Bootstrapper::new(plan(Variant::Release), runner.clone(), LocalWorkspace::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert!(runner
        .calls()
        .contains(&"python manage.py migrate --noinput".to_string()));
    assert!(report
        .messages
        .contains(&"Running database migrations...".to_string()));
    assert!(report
        .messages
        .contains(&"Migrations failed, continuing build...".to_string()));
    assert_eq!(report.suppressed_steps().count(), 1);
    assert_eq!(report.messages.last().unwrap(), COMPLETE_MESSAGE);
}

#[tokio::test]
async fn test_strict_variant_propagates_collectstatic_failure() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::failing_on(&["collectstatic"]);

    let result = Bootstrapper::new(plan(Variant::Strict), runner, LocalWorkspace::new(dir.path()))
        .run()
        .await;

    assert!(matches!(
        result,
        Err(BootstrapError::StepFailedError { ref step, .. }) if step == "collectstatic"
    ));
}

#[tokio::test]
async fn test_running_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("media")).unwrap();
    std::fs::write(dir.path().join("media/avatar.png"), b"png").unwrap();

    for _ in 0..2 {
        let report = Bootstrapper::new(
            plan(Variant::Build),
            ScriptedRunner::failing_on(&[]),
            LocalWorkspace::new(dir.path()),
        )
        .run()
        .await
        .unwrap();
        assert_eq!(
            report.outcome_of(&StepKind::ProvisionDirectories),
            Some(&StepOutcome::Succeeded)
        );
    }

    assert!(dir.path().join("staticfiles").is_dir());
    assert!(dir.path().join("media/avatar.png").exists());
}

#[tokio::test]
async fn test_management_commands_run_after_migrations() {
    let dir = TempDir::new().unwrap();
    let config = BootstrapConfig::from_toml_str(
        r#"
[bootstrap]
variant = "release"

[[management]]
name = "create_profiles"

[[management]]
name = "fix_user_profiles"
"#,
    )
    .unwrap();
    let runner = ScriptedRunner::failing_on(&["create_profiles"]);

    let report = Bootstrapper::new(
        BootstrapPlan::from_config(&config).unwrap(),
        runner.clone(),
        LocalWorkspace::new(dir.path()),
    )
    .run()
    .await
    .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[2], "python manage.py migrate --noinput");
    assert_eq!(calls[3], "python manage.py create_profiles");
    assert_eq!(calls[4], "python manage.py fix_user_profiles");
    assert!(report
        .messages
        .contains(&"create_profiles failed, continuing build...".to_string()));
    assert_eq!(
        report.outcome_of(&StepKind::ManagementCommand("fix_user_profiles".to_string())),
        Some(&StepOutcome::Succeeded)
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_processes_from_config() {
    let dir = TempDir::new().unwrap();
    let config = BootstrapConfig::from_toml_str(&format!(
        r#"
[bootstrap]
variant = "build"
working_dir = "{}"

[python]
settings_module = "teba.settings"

[steps.install]
command = ["true"]

[steps.collectstatic]
command = ["sh", "-c", "echo \"$DJANGO_SETTINGS_MODULE\" > settings.txt; exit 2"]
"#,
        dir.path().display()
    ))
    .unwrap();

    let report = Bootstrapper::from_config(&config).unwrap().run().await.unwrap();

    assert!(matches!(
        report.outcome_of(&StepKind::CollectStatic),
        Some(StepOutcome::Suppressed { reason }) if reason.contains("status 2")
    ));
    assert!(dir.path().join("staticfiles").is_dir());
    let settings = std::fs::read_to_string(dir.path().join("settings.txt")).unwrap();
    if std::env::var_os("DJANGO_SETTINGS_MODULE").is_none() {
        assert_eq!(settings.trim(), "teba.settings");
    }
}

#[tokio::test]
async fn test_unspawnable_installer_aborts() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::missing_program_for(&["pip"]);

    let (report, result) = Bootstrapper::new(plan(Variant::Build), runner.clone(), LocalWorkspace::new(dir.path()))
        .run_to_report()
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, BootstrapError::SpawnError { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(runner.calls().len(), 1);
    assert!(!dir.path().join("staticfiles").exists());
    assert!(!dir.path().join("media").exists());
    assert!(matches!(
        report.outcome_of(&StepKind::InstallDependencies),
        Some(StepOutcome::Failed { .. })
    ));
}

#[tokio::test]
async fn test_unspawnable_collectstatic_is_suppressed() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::missing_program_for(&["collectstatic"]);

    let report = Bootstrapper::new(plan(Variant::Build), runner, LocalWorkspace::new(dir.path()))
        .run()
        .await
        .unwrap();

    assert!(matches!(
        report.outcome_of(&StepKind::CollectStatic),
        Some(StepOutcome::Suppressed { reason }) if reason.contains("Failed to start")
    ));
    assert!(report
        .messages
        .contains(&"Static collection failed, continuing build...".to_string()));
    assert_eq!(report.messages.last().unwrap(), COMPLETE_MESSAGE);
    assert!(dir.path().join("staticfiles").is_dir());
}
