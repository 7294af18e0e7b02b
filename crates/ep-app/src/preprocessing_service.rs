//! Preprocessing configuration service.
//!
//! Operations here never return errors to their caller. Reads fall back to
//! defaults; writes return `false` (or an empty id) and push a status
//! message describing what failed.

use std::path::Path;
use std::time::Duration;

use ep_core::{EditError, EditResult};
use ep_markup::list_edit::ListTarget;
use ep_markup::{
    DROPDOWN_FAMILY, DropdownSpec, FixedSlider, RANGE_SLIDER_FAMILY, RangeSliderSpec,
    SliderValues,
};
use ep_script::PreprocessingParams;

use crate::document_store::{apply_file, commit_all, edit_file, load_document};
use crate::error::{AppError, AppResult};
use crate::run_service::{EngineCommand, EngineRun, EngineRunner};
use crate::settings::WorkspaceSettings;
use crate::status::StatusSender;

pub struct PreprocessingService {
    settings: WorkspaceSettings,
    status: StatusSender,
}

impl PreprocessingService {
    pub fn new(settings: WorkspaceSettings, status: StatusSender) -> Self {
        Self { settings, status }
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    fn report<T>(&self, what: &str, result: AppResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(AppError::Edit(EditError::Unchanged { what: detail })) => {
                tracing::info!(what, detail = %detail, "nothing to change");
                self.status.warning(format!("{what}: nothing to change ({detail})"));
                None
            }
            Err(e) => {
                tracing::warn!(what, error = %e, "operation failed");
                self.status.error(format!("{what} failed: {e}"));
                None
            }
        }
    }

    fn read_text(&self, path: &Path) -> Option<String> {
        let result = load_document(path).map(|doc| doc.into_text());
        self.report("Reading document", result)
    }

    fn edit_markup(&self, what: &str, edit: impl FnOnce(&str) -> EditResult<String>) -> bool {
        let result = edit_file(&self.settings.markup_path, edit);
        self.report(what, result).is_some()
    }

    fn edit_pipeline(&self, what: &str, edit: impl FnOnce(&str) -> EditResult<String>) -> bool {
        let result = edit_file(&self.settings.pipeline_path, edit);
        self.report(what, result).is_some()
    }

    // ---------------------------------------------------------------
    // Scripting files
    // ---------------------------------------------------------------

    /// Every parameter; defaults when the script cannot be read.
    pub fn load_params(&self) -> PreprocessingParams {
        let tokens = self.settings.bool_tokens();
        self.read_text(&self.settings.script_path)
            .map(|text| PreprocessingParams::read(&text, &tokens))
            .unwrap_or_default()
    }

    pub fn data_dir(&self) -> String {
        self.read_text(&self.settings.pipeline_path)
            .map(|text| ep_script::read_data_dir(&text))
            .unwrap_or_default()
    }

    pub fn set_data_dir(&self, path: &str) -> bool {
        let ok = self.edit_pipeline("Updating data directory", |text| {
            ep_script::write_data_dir(text, path)
        });
        if ok {
            let normalized = ep_script::pipeline::normalize_path(path);
            self.status.info(format!("Data directory set to {normalized}"));
        }
        ok
    }

    pub fn toolbox_path(&self) -> String {
        self.read_text(&self.settings.pipeline_path)
            .map(|text| ep_script::read_toolbox_path(&text))
            .unwrap_or_else(|| ep_script::pipeline::DEFAULT_TOOLBOX_PATH.to_string())
    }

    pub fn set_toolbox_path(&self, path: &str) -> bool {
        self.edit_pipeline("Updating toolbox path", |text| {
            ep_script::write_toolbox_path(text, path)
        })
    }

    pub fn channels(&self) -> Vec<String> {
        let tokens = self.settings.bool_tokens();
        self.read_text(&self.settings.pipeline_path)
            .map(|text| ep_script::read_channels(&text, &tokens))
            .unwrap_or_else(ep_script::keyed::default_channels)
    }

    pub fn set_channels(&self, channels: &[String]) -> bool {
        let tokens = self.settings.bool_tokens();
        self.edit_pipeline("Updating channels", |text| {
            ep_script::write_channels(text, channels, &tokens)
        })
    }

    /// Write the parameter set and the channel allowlist together. With
    /// `atomic_commit` set either both scripts change or neither does.
    pub fn save_configuration(&self, params: &PreprocessingParams, channels: &[String]) -> bool {
        let result = self.try_save_configuration(params, channels);
        let ok = self.report("Saving configuration", result).is_some();
        if ok {
            self.status.info(format!(
                "Configuration saved!\nprestim: {:.1}s, poststim: {:.1}s\ntrialfun: {}\neventtype: {}\neventvalue: {}\ndemean: {}\nchannels: {}",
                params.prestim,
                params.poststim,
                params.trialfun,
                params.eventtype,
                params.eventvalue.join(", "),
                if params.demean { &self.settings.on_token } else { &self.settings.off_token },
                channels.join(", "),
            ));
        }
        ok
    }

    fn try_save_configuration(
        &self,
        params: &PreprocessingParams,
        channels: &[String],
    ) -> AppResult<()> {
        let tokens = self.settings.bool_tokens();
        let mut script = load_document(&self.settings.script_path)?;
        let mut pipeline = load_document(&self.settings.pipeline_path)?;
        script.edit(|text| params.write(text, &tokens))?;
        pipeline.edit(|text| ep_script::write_channels(text, channels, &tokens))?;
        commit_all(&mut [&mut script, &mut pipeline], self.settings.atomic_commit)
    }

    /// Save, point the pipeline at `data_path`, and start the engine.
    pub fn save_and_run(
        &self,
        params: &PreprocessingParams,
        channels: &[String],
        data_path: &str,
        runner: &EngineRunner,
    ) -> Option<EngineRun> {
        if !self.save_configuration(params, channels) || !self.set_data_dir(data_path) {
            return None;
        }
        self.start_engine(runner)
    }

    pub fn start_engine(&self, runner: &EngineRunner) -> Option<EngineRun> {
        let engine = &self.settings.engine;
        let command = EngineCommand::batch(
            &engine.executable,
            &self.settings.engine_dir(),
            &engine.entry_script,
        );
        let result = runner.start(command, Duration::from_secs(engine.timeout_s));
        let run = self.report("Starting engine", result)?;
        self.status.info("Configuration saved! Starting processing in the background.");
        Some(run)
    }

    // ---------------------------------------------------------------
    // Page markup
    // ---------------------------------------------------------------

    /// Create or update the dropdown bound to `spec.matlab_property`.
    /// Returns its id, or an empty string on failure.
    pub fn save_dropdown(&self, spec: &DropdownSpec) -> String {
        let result = apply_file(&self.settings.markup_path, |text| {
            ep_markup::upsert_block(text, spec)
        });
        self.report("Saving custom dropdown", result)
            .unwrap_or_default()
    }

    pub fn update_dropdown(&self, id: &str, spec: &DropdownSpec) -> bool {
        self.edit_markup("Updating custom dropdown", |text| {
            ep_markup::update_block(text, id, spec)
        })
    }

    pub fn remove_dropdown(&self, id: &str) -> bool {
        self.edit_markup("Removing custom dropdown", |text| {
            ep_markup::delete_block(text, &DROPDOWN_FAMILY, id)
        })
    }

    pub fn dropdowns(&self) -> Vec<(String, DropdownSpec)> {
        self.read_text(&self.settings.markup_path)
            .and_then(|text| {
                let result = ep_markup::list_blocks::<DropdownSpec>(&text).map_err(AppError::from);
                self.report("Listing custom dropdowns", result)
            })
            .unwrap_or_default()
    }

    pub fn save_range_slider(&self, spec: &RangeSliderSpec) -> String {
        let result = apply_file(&self.settings.markup_path, |text| {
            ep_markup::upsert_block(text, spec)
        });
        self.report("Saving custom range slider", result)
            .unwrap_or_default()
    }

    pub fn update_range_slider(&self, id: &str, spec: &RangeSliderSpec) -> bool {
        self.edit_markup("Updating custom range slider", |text| {
            ep_markup::update_block(text, id, spec)
        })
    }

    pub fn remove_range_slider(&self, id: &str) -> bool {
        self.edit_markup("Removing custom range slider", |text| {
            ep_markup::delete_block(text, &RANGE_SLIDER_FAMILY, id)
        })
    }

    pub fn range_sliders(&self) -> Vec<(String, RangeSliderSpec)> {
        self.read_text(&self.settings.markup_path)
            .and_then(|text| {
                let result =
                    ep_markup::list_blocks::<RangeSliderSpec>(&text).map_err(AppError::from);
                self.report("Listing custom range sliders", result)
            })
            .unwrap_or_default()
    }

    pub fn slider(&self, slider: FixedSlider) -> Option<SliderValues> {
        let text = self.read_text(&self.settings.markup_path)?;
        let result = ep_markup::read_slider(&text, slider).map_err(AppError::from);
        self.report("Reading slider", result)
    }

    pub fn update_slider(&self, slider: FixedSlider, values: &SliderValues) -> bool {
        self.edit_markup("Updating slider", |text| {
            ep_markup::write_slider(text, slider, values)
        })
    }

    pub fn set_dropdown_state(&self, id: &str, state: &str) -> bool {
        self.edit_markup("Updating dropdown state", |text| {
            ep_markup::set_dropdown_state(text, id, state)
        })
    }

    /// Persist a combo box selection and reset its dropdown to the
    /// default interaction state.
    pub fn save_selection(&self, combo_id: &str, dropdown_id: &str, index: i64) -> bool {
        let saved = self.edit_markup("Saving selection", |text| {
            ep_markup::set_current_index(text, combo_id, index)
        });
        self.set_dropdown_state(dropdown_id, "default") && saved
    }

    pub fn list_items(&self, target: ListTarget) -> Vec<String> {
        self.read_text(&self.settings.markup_path)
            .and_then(|text| {
                let result = ep_markup::read_list(&text, target).map_err(AppError::from);
                self.report("Reading list", result)
            })
            .unwrap_or_default()
    }

    pub fn add_list_item(&self, target: ListTarget, item: &str) -> bool {
        self.edit_markup("Adding list item", |text| {
            ep_markup::add_list_item(text, target, item)
        })
    }

    pub fn remove_list_item(&self, target: ListTarget, item: &str) -> bool {
        self.edit_markup("Removing list item", |text| {
            ep_markup::remove_list_item(text, target, item)
        })
    }

    /// Add an option to a named model list, then reset the owning
    /// dropdown to its default state whether or not the add succeeded.
    pub fn add_model_option(&self, target: ListTarget, dropdown_id: &str, option: &str) -> bool {
        let added = self.add_list_item(target, option);
        self.set_dropdown_state(dropdown_id, "default");
        added
    }
}
