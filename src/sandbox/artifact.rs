// src/sandbox/artifact.rs

use super::language::LanguageSpec;
use crate::run_id::RunId;

use std::path::{Path, PathBuf};

/// A snippet written to the shared directory for one run.
///
/// `host_path` is where this process wrote it; `sandbox_path` is the same
/// file as addressed from inside the isolated environment.
#[derive(Debug, Clone)]
pub struct StagedArtifact {
    pub run_id: RunId,
    pub host_path: PathBuf,
    pub sandbox_path: PathBuf,
}

impl StagedArtifact {
    /// Write `code` to `<host_dir>/<run id>.<ext>`.
    pub async fn stage(
        code: &str,
        spec: &LanguageSpec,
        host_dir: &Path,
        sandbox_dir: &Path,
    ) -> std::io::Result<Self> {
        let run_id = RunId::new();
        let file_name = format!("{}.{}", run_id, spec.extension);

        let host_path = host_dir.join(&file_name);
        let sandbox_path = sandbox_dir.join(&file_name);

        tokio::fs::write(&host_path, code).await?;

        Ok(Self {
            run_id,
            host_path,
            sandbox_path,
        })
    }

    pub fn sandbox_path_str(&self) -> String {
        self.sandbox_path.to_string_lossy().to_string()
    }
}
