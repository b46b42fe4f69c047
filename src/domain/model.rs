use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 啟動流程中的步驟種類
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum StepKind {
    InstallDependencies,
    ProvisionDirectories,
    CollectStatic,
    Migrate,
    ManagementCommand(String),
}

impl StepKind {
    /// 用於錯誤訊息與日誌的短名稱
    pub fn name(&self) -> &str {
        match self {
            StepKind::InstallDependencies => "install",
            StepKind::ProvisionDirectories => "directories",
            StepKind::CollectStatic => "collectstatic",
            StepKind::Migrate => "migrate",
            StepKind::ManagementCommand(name) => name,
        }
    }

    pub fn progress_message(&self) -> String {
        match self {
            StepKind::InstallDependencies => "Installing dependencies...".to_string(),
            StepKind::ProvisionDirectories => {
                "Creating static and media directories...".to_string()
            }
            StepKind::CollectStatic => "Collecting static files...".to_string(),
            StepKind::Migrate => "Running database migrations...".to_string(),
            StepKind::ManagementCommand(name) => format!("Running management command {}...", name),
        }
    }

    pub fn default_fallback_message(&self) -> String {
        match self {
            StepKind::CollectStatic => "Static collection failed, continuing build...".to_string(),
            StepKind::Migrate => "Migrations failed, continuing build...".to_string(),
            other => format!("{} failed, continuing build...", other.name()),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 外部命令列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// 從 `["pip", "install", ...]` 形式建立，空陣列回傳 None
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// 步驟失敗時的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// 中止整個流程並以非零狀態退出
    Abort,
    /// 印出備援訊息後繼續
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Continue => f.write_str("continue"),
        }
    }
}

/// 外部命令的結束狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        Self {
            success: code == 0,
            code: Some(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StepOutcome {
    Succeeded,
    Suppressed { reason: String },
    /// 中止流程的失敗
    Failed { reason: String },
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepKind,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
}

/// 一次啟動流程的執行結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    pub started_at: DateTime<Utc>,
    pub variant: String,
    pub dry_run: bool,
    pub steps: Vec<StepRecord>,
    pub messages: Vec<String>,
}

impl BootstrapReport {
    pub fn new(variant: impl Into<String>, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            variant: variant.into(),
            dry_run,
            steps: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn suppressed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|record| matches!(record.outcome, StepOutcome::Suppressed { .. }))
    }

    pub fn outcome_of(&self, step: &StepKind) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| &record.step == step)
            .map(|record| &record.outcome)
    }
}
