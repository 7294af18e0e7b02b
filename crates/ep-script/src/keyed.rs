//! Generic keyed read/write with per-key defaults.
//!
//! Every configurable script value is described once by a [`KeySpec`];
//! reading never fails (it falls back to the key's default) and writing
//! substitutes only the value portion of the live statement.

use ep_core::literal::CellSeparator;
use ep_core::{EditError, EditResult, FloatFormat};

use crate::assignment::{find_assignments, replace_value};
use crate::value::{self, BoolTokens, ScriptValue, Style, ValueKind};

#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub key: &'static str,
    pub kind: ValueKind,
    pub style: Style,
    /// Fall back to a commented-out statement when no live one exists.
    pub read_commented: bool,
    pub default: fn() -> ScriptValue,
}

const fn style(float: FloatFormat, separator: CellSeparator) -> Style {
    Style { float, separator }
}

const PLAIN: Style = style(FloatFormat::Shortest, CellSeparator::Space);

pub const PRESTIM: KeySpec = KeySpec {
    key: "cfg.trialdef.prestim",
    kind: ValueKind::Float,
    style: style(FloatFormat::Fixed(1), CellSeparator::Space),
    read_commented: false,
    default: || ScriptValue::Float(0.5),
};

pub const POSTSTIM: KeySpec = KeySpec {
    key: "cfg.trialdef.poststim",
    kind: ValueKind::Float,
    style: style(FloatFormat::Fixed(1), CellSeparator::Space),
    read_commented: false,
    default: || ScriptValue::Float(1.0),
};

pub const TRIALFUN: KeySpec = KeySpec {
    key: "cfg.trialfun",
    kind: ValueKind::String,
    style: PLAIN,
    read_commented: false,
    default: || ScriptValue::String("ft_trialfun_general".to_string()),
};

pub const EVENTTYPE: KeySpec = KeySpec {
    key: "cfg.trialdef.eventtype",
    kind: ValueKind::String,
    style: PLAIN,
    read_commented: false,
    default: || ScriptValue::String("Stimulus".to_string()),
};

pub const EVENTVALUE: KeySpec = KeySpec {
    key: "cfg.trialdef.eventvalue",
    kind: ValueKind::StringArray,
    style: PLAIN,
    read_commented: false,
    default: || ScriptValue::StringArray(default_event_values()),
};

pub const DEMEAN: KeySpec = KeySpec {
    key: "cfg.demean",
    kind: ValueKind::Bool,
    style: PLAIN,
    read_commented: false,
    default: || ScriptValue::Bool(true),
};

pub const BASELINE_WINDOW: KeySpec = KeySpec {
    key: "cfg.baselinewindow",
    kind: ValueKind::FloatArray,
    style: style(FloatFormat::Fixed(1), CellSeparator::Space),
    read_commented: true,
    default: || ScriptValue::FloatArray(vec![-0.2, 0.0]),
};

pub const DFTFILTER: KeySpec = KeySpec {
    key: "cfg.dftfilter",
    kind: ValueKind::Bool,
    style: PLAIN,
    read_commented: false,
    default: || ScriptValue::Bool(true),
};

pub const DFTFREQ: KeySpec = KeySpec {
    key: "cfg.dftfreq",
    kind: ValueKind::FloatArray,
    style: style(FloatFormat::Fixed(0), CellSeparator::Space),
    read_commented: true,
    default: || ScriptValue::FloatArray(vec![50.0, 60.0]),
};

pub const ACCEPTED_CHANNELS: KeySpec = KeySpec {
    key: "accepted_channels",
    kind: ValueKind::StringArray,
    style: style(FloatFormat::Shortest, CellSeparator::Comma),
    read_commented: false,
    default: || ScriptValue::StringArray(default_channels()),
};

pub fn default_event_values() -> Vec<String> {
    ["S200", "S201", "S202"].map(String::from).to_vec()
}

pub fn default_channels() -> Vec<String> {
    ["F4", "Fz", "C3", "Pz", "P3", "O1", "Oz", "O2", "P4", "Cz", "C4"]
        .map(String::from)
        .to_vec()
}

/// Every key the preprocessing script and pipeline driver expose.
pub const CATALOGUE: [KeySpec; 10] = [
    PRESTIM,
    POSTSTIM,
    TRIALFUN,
    EVENTTYPE,
    EVENTVALUE,
    DEMEAN,
    BASELINE_WINDOW,
    DFTFILTER,
    DFTFREQ,
    ACCEPTED_CHANNELS,
];

pub fn lookup(key: &str) -> Option<&'static KeySpec> {
    CATALOGUE.iter().find(|spec| spec.key == key)
}

/// Decode the value for `spec`, reporting why it is unavailable.
pub fn try_read(text: &str, spec: &KeySpec, tokens: &BoolTokens) -> EditResult<ScriptValue> {
    let all = find_assignments(text, spec.key)?;
    let chosen = all
        .iter()
        .find(|a| !a.is_commented)
        .or_else(|| all.iter().find(|a| a.is_commented && spec.read_commented))
        .ok_or_else(|| EditError::not_found(format!("assignment to `{}`", spec.key)))?;
    value::decode(spec.kind, &chosen.raw, tokens)
}

/// Decode the value for `spec`, or its default when absent or malformed.
pub fn read_keyed(text: &str, spec: &KeySpec, tokens: &BoolTokens) -> ScriptValue {
    match try_read(text, spec, tokens) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(key = spec.key, %err, "using default");
            (spec.default)()
        }
    }
}

/// Substitute `value` into the live statement for `spec`.
pub fn write_keyed(
    text: &str,
    spec: &KeySpec,
    value: &ScriptValue,
    tokens: &BoolTokens,
) -> EditResult<String> {
    if value.kind() != spec.kind {
        return Err(EditError::malformed(
            "value kind",
            format!("{:?} for `{}` (expects {:?})", value.kind(), spec.key, spec.kind),
        ));
    }
    replace_value(text, spec.key, &value::encode(value, spec.style, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_fall_back_to_defaults() {
        let tokens = BoolTokens::default();
        let text = "cfg = [];\n";
        assert_eq!(read_keyed(text, &PRESTIM, &tokens), ScriptValue::Float(0.5));
        assert_eq!(read_keyed(text, &POSTSTIM, &tokens), ScriptValue::Float(1.0));
        assert_eq!(read_keyed(text, &DEMEAN, &tokens), ScriptValue::Bool(true));
        assert_eq!(
            read_keyed(text, &DFTFREQ, &tokens),
            ScriptValue::FloatArray(vec![50.0, 60.0])
        );
        assert_eq!(
            read_keyed(text, &ACCEPTED_CHANNELS, &tokens)
                .as_strings()
                .map(<[String]>::len),
            Some(11)
        );
    }

    #[test]
    fn malformed_literal_reads_as_default() {
        let tokens = BoolTokens::default();
        let text = "cfg.trialdef.prestim = abc;\n";
        assert_eq!(read_keyed(text, &PRESTIM, &tokens), ScriptValue::Float(0.5));
    }

    #[test]
    fn commented_fallback_only_where_allowed() {
        let tokens = BoolTokens::default();
        let text = "% cfg.baselinewindow = [-0.5 0];\n% cfg.trialfun = 'mine';\n";
        assert_eq!(
            read_keyed(text, &BASELINE_WINDOW, &tokens),
            ScriptValue::FloatArray(vec![-0.5, 0.0])
        );
        assert_eq!(
            read_keyed(text, &TRIALFUN, &tokens),
            ScriptValue::String("ft_trialfun_general".into())
        );
    }

    #[test]
    fn write_rejects_wrong_kind_and_missing_key() {
        let tokens = BoolTokens::default();
        let text = "cfg.demean = 'no';\n";
        assert!(write_keyed(text, &DEMEAN, &ScriptValue::Float(1.0), &tokens).is_err());
        assert!(write_keyed(text, &PRESTIM, &ScriptValue::Float(1.0), &tokens).is_err());
        assert_eq!(
            write_keyed(text, &DEMEAN, &ScriptValue::Bool(true), &tokens).unwrap(),
            "cfg.demean = 'yes';\n"
        );
    }

    #[test]
    fn catalogue_lookup() {
        assert_eq!(lookup("cfg.dftfreq").map(|s| s.kind), Some(ValueKind::FloatArray));
        assert!(lookup("cfg.unknown").is_none());
    }
}
