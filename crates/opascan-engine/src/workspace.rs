//! Scratch directory holding one evaluation's modules and input.

use std::path::{Path, PathBuf};

use opascan_core::EvaluationRequest;
use tempfile::TempDir;

const MODULES_DIR: &str = "modules";
const INPUT_FILE: &str = "input.json";

/// Modules and input written to disk for the `opa` binary.
///
/// The directory is removed when the workspace is dropped.
pub struct PolicyWorkspace {
    dir: TempDir,
    /// (module name, file written for it), in request order.
    modules: Vec<(String, PathBuf)>,
}

impl PolicyWorkspace {
    pub async fn materialize(request: &EvaluationRequest) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("opascan-").tempdir()?;
        let modules_dir = dir.path().join(MODULES_DIR);
        tokio::fs::create_dir_all(&modules_dir).await?;

        let mut modules = Vec::with_capacity(request.modules.len());
        for (idx, (name, source)) in request.modules.iter().enumerate() {
            let path = modules_dir.join(module_file_name(idx, name));
            tokio::fs::write(&path, source).await?;
            modules.push((name.clone(), path));
        }

        let input = serde_json::to_vec(&request.input)?;
        tokio::fs::write(dir.path().join(INPUT_FILE), input).await?;

        Ok(Self { dir, modules })
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.dir.path().join(MODULES_DIR)
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join(INPUT_FILE)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Replace scratch file paths in engine messages with module names.
    pub fn rewrite_paths(&self, message: &str) -> String {
        let mut message = message.to_string();
        for (name, path) in &self.modules {
            message = message.replace(&path.to_string_lossy().into_owned(), name);
        }
        message
    }
}

/// Stable, filesystem-safe file name for a module.
fn module_file_name(idx: usize, name: &str) -> String {
    let stem = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim_end_matches(".rego");
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{:03}_{}.rego", idx, stem)
}
