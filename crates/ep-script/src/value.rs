//! Value kinds carried by assignment statements.

use ep_core::literal::{
    CellSeparator, format_cell_strings, format_float, format_float_array, parse_cell_strings,
    parse_float, parse_float_array, parse_script_string, quote_script,
};
use ep_core::{EditResult, FloatFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Float,
    FloatArray,
    String,
    StringArray,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptValue {
    Bool(bool),
    Float(f64),
    FloatArray(Vec<f64>),
    String(String),
    StringArray(Vec<String>),
}

impl ScriptValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ScriptValue::Float(_) => ValueKind::Float,
            ScriptValue::FloatArray(_) => ValueKind::FloatArray,
            ScriptValue::String(_) => ValueKind::String,
            ScriptValue::StringArray(_) => ValueKind::StringArray,
            ScriptValue::Bool(_) => ValueKind::Bool,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            ScriptValue::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ScriptValue::StringArray(v) => Some(v),
            _ => None,
        }
    }
}

/// Quoted tokens standing for boolean values (`'yes'`/`'no'`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolTokens {
    pub on: String,
    pub off: String,
}

impl Default for BoolTokens {
    fn default() -> Self {
        Self {
            on: "yes".to_string(),
            off: "no".to_string(),
        }
    }
}

/// How a value is rendered back into script text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub float: FloatFormat,
    pub separator: CellSeparator,
}

pub fn decode(kind: ValueKind, raw: &str, tokens: &BoolTokens) -> EditResult<ScriptValue> {
    Ok(match kind {
        ValueKind::Float => ScriptValue::Float(parse_float(raw)?),
        ValueKind::FloatArray => ScriptValue::FloatArray(parse_float_array(raw)?),
        ValueKind::String => ScriptValue::String(parse_script_string(raw)?),
        ValueKind::StringArray => ScriptValue::StringArray(parse_cell_strings(raw)?),
        ValueKind::Bool => {
            let token = parse_script_string(raw)?;
            ScriptValue::Bool(token.eq_ignore_ascii_case(&tokens.on))
        }
    })
}

pub fn encode(value: &ScriptValue, style: Style, tokens: &BoolTokens) -> String {
    match value {
        ScriptValue::Float(v) => format_float(*v, style.float),
        ScriptValue::FloatArray(v) => format_float_array(v, style.float),
        ScriptValue::String(v) => quote_script(v),
        ScriptValue::StringArray(v) => format_cell_strings(v, style.separator),
        ScriptValue::Bool(v) => quote_script(if *v { &tokens.on } else { &tokens.off }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_is_case_insensitive() {
        let tokens = BoolTokens::default();
        assert_eq!(
            decode(ValueKind::Bool, "'YES'", &tokens).unwrap(),
            ScriptValue::Bool(true)
        );
        assert_eq!(
            decode(ValueKind::Bool, "'maybe'", &tokens).unwrap(),
            ScriptValue::Bool(false)
        );
        assert!(decode(ValueKind::Bool, "true", &tokens).is_err());
    }

    #[test]
    fn encode_uses_style() {
        let tokens = BoolTokens::default();
        let style = Style {
            float: FloatFormat::Fixed(1),
            separator: CellSeparator::Comma,
        };
        assert_eq!(
            encode(&ScriptValue::FloatArray(vec![-0.1, 0.3]), style, &tokens),
            "[-0.1 0.3]"
        );
        assert_eq!(
            encode(
                &ScriptValue::StringArray(vec!["Fz".into(), "Cz".into()]),
                style,
                &tokens
            ),
            "{'Fz', 'Cz'}"
        );
        assert_eq!(encode(&ScriptValue::Bool(false), style, &tokens), "'no'");
    }
}
