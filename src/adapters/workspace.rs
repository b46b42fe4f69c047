use crate::domain::ports::Workspace;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Workspace for LocalWorkspace {
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        let full_path = self.root.join(path);
        // create_dir_all 對已存在的目錄不會報錯
        tokio::fs::create_dir_all(&full_path).await?;
        tracing::debug!("Ensured directory {}", full_path.display());
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
