//! The preprocessing parameter set read from and written to the
//! preprocess_data script as a whole.

use ep_core::EditResult;
use serde::{Deserialize, Serialize};

use crate::keyed::{self, KeySpec, default_event_values, read_keyed, write_keyed};
use crate::toggle::{BASELINE_GROUP, DFT_GROUP, read_toggle_group, write_toggle_group};
use crate::value::{BoolTokens, ScriptValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingParams {
    pub prestim: f64,
    pub poststim: f64,
    pub trialfun: String,
    pub eventtype: String,
    pub eventvalue: Vec<String>,
    pub demean: bool,
    pub baseline_window: Vec<f64>,
    pub dftfilter: bool,
    pub dftfreq: Vec<f64>,
}

impl Default for PreprocessingParams {
    fn default() -> Self {
        Self {
            prestim: 0.5,
            poststim: 1.0,
            trialfun: "ft_trialfun_general".to_string(),
            eventtype: "Stimulus".to_string(),
            eventvalue: default_event_values(),
            demean: true,
            baseline_window: vec![-0.2, 0.0],
            dftfilter: true,
            dftfreq: vec![50.0, 60.0],
        }
    }
}

fn float(text: &str, spec: &KeySpec, tokens: &BoolTokens, fallback: f64) -> f64 {
    read_keyed(text, spec, tokens).as_f64().unwrap_or(fallback)
}

fn string(text: &str, spec: &KeySpec, tokens: &BoolTokens, fallback: String) -> String {
    match read_keyed(text, spec, tokens) {
        ScriptValue::String(value) => value,
        _ => fallback,
    }
}

impl PreprocessingParams {
    /// Read every parameter; absent or malformed ones take their default.
    pub fn read(text: &str, tokens: &BoolTokens) -> Self {
        let defaults = Self::default();
        let (demean, baseline_window) = read_toggle_group(text, &BASELINE_GROUP, tokens);
        let (dftfilter, dftfreq) = read_toggle_group(text, &DFT_GROUP, tokens);
        let eventvalue = match read_keyed(text, &keyed::EVENTVALUE, tokens) {
            ScriptValue::StringArray(items) => items,
            _ => defaults.eventvalue,
        };

        Self {
            prestim: float(text, &keyed::PRESTIM, tokens, defaults.prestim),
            poststim: float(text, &keyed::POSTSTIM, tokens, defaults.poststim),
            trialfun: string(text, &keyed::TRIALFUN, tokens, defaults.trialfun),
            eventtype: string(text, &keyed::EVENTTYPE, tokens, defaults.eventtype),
            eventvalue,
            demean,
            baseline_window,
            dftfilter,
            dftfreq,
        }
    }

    /// Write every parameter into `text`.
    ///
    /// Fails on the first statement that cannot be located; the caller's
    /// text is not modified in that case since the result is only
    /// returned on success.
    pub fn write(&self, text: &str, tokens: &BoolTokens) -> EditResult<String> {
        let eventvalue = if self.eventvalue.is_empty() {
            default_event_values()
        } else {
            self.eventvalue.clone()
        };

        let scalars = [
            (&keyed::PRESTIM, ScriptValue::Float(self.prestim)),
            (&keyed::POSTSTIM, ScriptValue::Float(self.poststim)),
            (&keyed::TRIALFUN, ScriptValue::String(self.trialfun.clone())),
            (&keyed::EVENTTYPE, ScriptValue::String(self.eventtype.clone())),
            (&keyed::EVENTVALUE, ScriptValue::StringArray(eventvalue)),
        ];

        let mut out = text.to_string();
        for (spec, value) in &scalars {
            out = write_keyed(&out, spec, value, tokens)?;
        }
        out = write_toggle_group(
            &out,
            &BASELINE_GROUP,
            self.demean,
            Some(self.baseline_window.as_slice()),
            tokens,
        )?;
        out = write_toggle_group(
            &out,
            &DFT_GROUP,
            self.dftfilter,
            Some(self.dftfreq.as_slice()),
            tokens,
        )?;
        Ok(out)
    }
}
