use crate::core::plan::Variant;
use crate::domain::model::FailurePolicy;
use crate::utils::error::{BootstrapError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 預設設定檔名稱，位於工作目錄
pub const DEFAULT_CONFIG_FILE: &str = "bootstrap.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub bootstrap: BootstrapSection,
    pub python: PythonConfig,
    pub directories: DirectoriesConfig,
    pub steps: StepsConfig,
    pub management: Vec<ManagementCommandConfig>,
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSection {
    pub variant: Option<Variant>,
    pub working_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    pub interpreter: Option<String>,
    pub manage_script: Option<String>,
    pub manifest: Option<String>,
    pub settings_module: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoriesConfig {
    pub paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    pub install: StepConfig,
    pub collectstatic: StepConfig,
    pub migrate: StepConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub enabled: Option<bool>,
    pub command: Option<Vec<String>>,
    pub on_failure: Option<FailurePolicy>,
    pub fallback_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementCommandConfig {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub on_failure: Option<FailurePolicy>,
    pub fallback_message: Option<String>,
}

impl BootstrapConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，環境變數只在解析後的字串值內替換
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parse_error = |e: toml::de::Error| BootstrapError::ConfigParseError {
            message: format!("TOML parsing error: {}", e),
        };

        let table: toml::Table = toml::from_str(content).map_err(parse_error)?;
        let re = env_var_pattern()?;
        let value = substitute_env_vars(toml::Value::Table(table), &re);

        value.try_into().map_err(parse_error)
    }

    /// 載入明確指定的設定檔；未指定時讀取工作目錄下的預設檔，不存在則使用預設值
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(BootstrapError::InvalidConfigValueError {
                        field: "config".to_string(),
                        value: path.display().to_string(),
                        reason: "Config file does not exist".to_string(),
                    });
                }
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None => {
                let default_path = working_dir.join(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    tracing::info!("Loading configuration from {}", default_path.display());
                    Self::from_file(default_path)
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// 命令實際執行的目錄
    pub fn working_dir(&self) -> PathBuf {
        PathBuf::from(self.bootstrap.working_dir.as_deref().unwrap_or("."))
    }

    pub fn interpreter(&self) -> &str {
        self.python.interpreter.as_deref().unwrap_or("python")
    }

    pub fn manage_script(&self) -> &str {
        self.python.manage_script.as_deref().unwrap_or("manage.py")
    }

    pub fn manifest(&self) -> &str {
        self.python.manifest.as_deref().unwrap_or("requirements.txt")
    }

    pub fn directory_paths(&self) -> Vec<String> {
        self.directories
            .paths
            .clone()
            .unwrap_or_else(|| vec!["staticfiles".to_string(), "media".to_string()])
    }

    /// 傳給子行程的額外環境變數
    pub fn environment(&self) -> HashMap<String, String> {
        self.environment.clone().unwrap_or_default()
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(working_dir) = &self.bootstrap.working_dir {
            validation::validate_path("bootstrap.working_dir", working_dir)?;
        }

        validation::validate_non_empty_string("python.interpreter", self.interpreter())?;
        validation::validate_non_empty_string("python.manage_script", self.manage_script())?;
        validation::validate_path("python.manifest", self.manifest())?;

        let paths = self.directory_paths();
        if paths.is_empty() {
            return Err(BootstrapError::MissingConfigError {
                field: "directories.paths".to_string(),
            });
        }
        for path in &paths {
            validation::validate_relative_path("directories.paths", path)?;
        }

        // 依賴安裝失敗一律中止
        if self.steps.install.enabled == Some(false) {
            return Err(BootstrapError::InvalidConfigValueError {
                field: "steps.install.enabled".to_string(),
                value: "false".to_string(),
                reason: "Dependency installation cannot be disabled".to_string(),
            });
        }
        if self.steps.install.on_failure == Some(FailurePolicy::Continue) {
            return Err(BootstrapError::InvalidConfigValueError {
                field: "steps.install.on_failure".to_string(),
                value: FailurePolicy::Continue.to_string(),
                reason: "Dependency installation failure is always fatal".to_string(),
            });
        }

        for (field, step) in [
            ("steps.install.command", &self.steps.install),
            ("steps.collectstatic.command", &self.steps.collectstatic),
            ("steps.migrate.command", &self.steps.migrate),
        ] {
            if let Some(command) = &step.command {
                validation::validate_command_line(field, command)?;
            }
        }

        for command in &self.management {
            validation::validate_non_empty_string("management.name", &command.name)?;
            if command.name.chars().any(char::is_whitespace) {
                return Err(BootstrapError::InvalidConfigValueError {
                    field: "management.name".to_string(),
                    value: command.name.clone(),
                    reason: "Command name cannot contain whitespace".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn env_var_pattern() -> Result<regex::Regex> {
    regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| BootstrapError::ConfigParseError {
        message: format!("Invalid substitution pattern: {}", e),
    })
}

/// 替換環境變數 (例如 ${DATABASE_URL})，未設定時保留原字串
fn substitute_env_vars(value: toml::Value, re: &regex::Regex) -> toml::Value {
    match value {
        toml::Value::String(text) => {
            let result = re.replace_all(&text, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            });
            toml::Value::String(result.into_owned())
        }
        toml::Value::Array(items) => toml::Value::Array(
            items
                .into_iter()
                .map(|item| substitute_env_vars(item, re))
                .collect(),
        ),
        toml::Value::Table(table) => toml::Value::Table(
            table
                .into_iter()
                .map(|(key, item)| (key, substitute_env_vars(item, re)))
                .collect(),
        ),
        other => other,
    }
}

impl Validate for BootstrapConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
