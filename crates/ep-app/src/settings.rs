//! Workspace settings: where the host files live and how the engine runs.

use std::path::{Path, PathBuf};

use ep_script::BoolTokens;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Settings file name looked up in a workspace root.
pub const SETTINGS_FILE: &str = "eegprep.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub executable: String,
    pub timeout_s: u64,
    /// Script run by the engine, without extension.
    pub entry_script: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            executable: "matlab".to_string(),
            timeout_s: 600,
            entry_script: "preprocessing".to_string(),
        }
    }
}

/// Paths are relative to the workspace root unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    pub script_path: PathBuf,
    pub pipeline_path: PathBuf,
    pub markup_path: PathBuf,
    pub classification_markup_path: PathBuf,
    pub classifier_source_path: PathBuf,
    pub engine: EngineSettings,
    pub on_token: String,
    pub off_token: String,
    /// Commit multi-file saves through staged temporary files.
    pub atomic_commit: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            script_path: PathBuf::from("features/preprocessing/matlab/preprocess_data.m"),
            pipeline_path: PathBuf::from("features/preprocessing/matlab/preprocessing.m"),
            markup_path: PathBuf::from("features/preprocessing/ui/preprocessing_page.qml"),
            classification_markup_path: PathBuf::from(
                "features/classification/ui/classification_page.qml",
            ),
            classifier_source_path: PathBuf::from(
                "features/classification/python/classifier_prototype.py",
            ),
            engine: EngineSettings::default(),
            on_token: "yes".to_string(),
            off_token: "no".to_string(),
            atomic_commit: true,
        }
    }
}

impl WorkspaceSettings {
    /// Load `eegprep.yaml` from `root`, or defaults when there is none.
    /// Relative paths are resolved against `root` either way.
    pub fn load_or_default(root: &Path) -> AppResult<Self> {
        let path = root.join(SETTINGS_FILE);
        let settings = if path.is_file() {
            Self::load(&path)?
        } else {
            tracing::debug!(root = %root.display(), "no settings file, using defaults");
            Self::default()
        };
        Ok(settings.rooted(root))
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::DocumentRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Settings(format!("Failed to parse settings YAML: {}", e)))
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| AppError::Settings(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content).map_err(|e| AppError::DocumentWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolve every relative path against `root`.
    pub fn rooted(mut self, root: &Path) -> Self {
        for path in [
            &mut self.script_path,
            &mut self.pipeline_path,
            &mut self.markup_path,
            &mut self.classification_markup_path,
            &mut self.classifier_source_path,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }

    pub fn bool_tokens(&self) -> BoolTokens {
        BoolTokens {
            on: self.on_token.clone(),
            off: self.off_token.clone(),
        }
    }

    /// Directory the engine is started in: the pipeline script's folder.
    pub fn engine_dir(&self) -> PathBuf {
        self.pipeline_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}
