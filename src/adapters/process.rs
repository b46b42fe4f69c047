use crate::domain::model::{CommandSpec, CommandStatus};
use crate::domain::ports::CommandRunner;
use crate::utils::error::{BootstrapError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// 以子行程執行命令，stdout/stderr 直接繼承給父行程
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
    env: HashMap<String, String>,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// 只在父行程尚未定義時設定 (等同 setdefault)
    pub fn with_default_env(mut self, key: &str, value: &str) -> Self {
        if std::env::var_os(key).is_none() && !self.env.contains_key(key) {
            self.env.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandStatus> {
        tracing::debug!("Spawning `{}` in {}", command, self.working_dir.display());

        // 不允許互動式輸入
        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| BootstrapError::SpawnError {
                command: command.to_string(),
                source,
            })?;

        tracing::debug!("`{}` exited with {:?}", command, status.code());

        Ok(CommandStatus {
            success: status.success(),
            code: status.code(),
        })
    }
}
