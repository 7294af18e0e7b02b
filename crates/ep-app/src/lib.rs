//! Shared application service layer for eegprep.
//!
//! Frontends go through these services instead of the editing crates
//! directly. Services own the file boundary, turn failures into sentinel
//! results plus status messages, and start external engine runs.

pub mod classification_service;
pub mod document_store;
pub mod error;
pub mod preprocessing_service;
pub mod run_service;
pub mod settings;
pub mod status;

pub use classification_service::{ClassificationService, format_layer_list, layers_from_source};
pub use document_store::{commit_all, commit_document, edit_file, load_document};
pub use error::{AppError, AppResult};
pub use preprocessing_service::PreprocessingService;
pub use run_service::{EngineCommand, EngineReport, EngineRun, EngineRunner, RunStatus};
pub use settings::{EngineSettings, SETTINGS_FILE, WorkspaceSettings};
pub use status::{StatusLevel, StatusMessage, StatusSender, status_channel};
