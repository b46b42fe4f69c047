use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration parse error: {message}")]
    ConfigParseError { message: String },

    #[error("Invalid configuration value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to start '{command}': {source}")]
    SpawnError {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' failed: '{command}' exited with {}", exit_label(.code))]
    StepFailedError {
        step: String,
        command: String,
        code: Option<i32>,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 配置錯誤，尚未執行任何步驟
    Configuration,
    /// 必要步驟失敗
    Fatal,
    /// 系統層級錯誤 (檔案系統、序列化)
    System,
}

impl BootstrapError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BootstrapError::ConfigParseError { .. }
            | BootstrapError::InvalidConfigValueError { .. }
            | BootstrapError::MissingConfigError { .. } => ErrorSeverity::Configuration,
            BootstrapError::SpawnError { .. } | BootstrapError::StepFailedError { .. } => {
                ErrorSeverity::Fatal
            }
            BootstrapError::IoError(_) | BootstrapError::SerializationError(_) => {
                ErrorSeverity::System
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Fatal => 1,
            ErrorSeverity::Configuration => 2,
            ErrorSeverity::System => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BootstrapError::StepFailedError { step, .. } if step == "install" => {
                "Check that the dependency manifest exists and every package in it resolves"
                    .to_string()
            }
            BootstrapError::StepFailedError { step, .. } => {
                format!("Inspect the output of the '{}' step above", step)
            }
            BootstrapError::SpawnError { command, .. } => {
                format!(
                    "Make sure '{}' is installed and on PATH",
                    command.split_whitespace().next().unwrap_or(command)
                )
            }
            BootstrapError::ConfigParseError { .. } => {
                "Make sure the config file is valid TOML".to_string()
            }
            BootstrapError::InvalidConfigValueError { field, .. }
            | BootstrapError::MissingConfigError { field } => {
                format!("Fix the '{}' setting in the config file or CLI flags", field)
            }
            BootstrapError::IoError(_) => {
                "Check permissions on the working directory".to_string()
            }
            BootstrapError::SerializationError(_) => {
                "Report output could not be encoded; retry without --report".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
