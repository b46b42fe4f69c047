use crate::domain::model::{CommandSpec, CommandStatus};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// 執行外部命令並等待其結束
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<CommandStatus>;
}

/// 啟動流程可寫入的檔案系統範圍
#[async_trait]
pub trait Workspace: Send + Sync {
    /// 確保目錄存在，已存在時不做任何事
    async fn ensure_dir(&self, path: &Path) -> Result<()>;

    fn root(&self) -> &Path;
}
