//! Helpers for the pipeline driver script: input data directory, toolbox
//! search path and the channel allowlist.

use std::sync::LazyLock;

use ep_core::literal::{parse_script_string, quote_script};
use ep_core::span::splice;
use ep_core::{EditError, EditResult, ScanTable, Span, Syntax};
use regex::Regex;

use crate::assignment::{first_live, replace_value};
use crate::keyed::{self, read_keyed, write_keyed};
use crate::value::{BoolTokens, ScriptValue};

pub const DATA_DIR_KEY: &str = "data_dir";
pub const DEFAULT_TOOLBOX_PATH: &str = "C:/FIELDTRIP";

static ADDPATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"addpath\(\s*'(?P<path>(?:[^'\n]|'')*)'\s*\)")
        .expect("ADDPATH is a valid static regex pattern")
});

/// Strip a `file:///` URL prefix and use forward slashes throughout.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    let path = path.strip_prefix("file:///").unwrap_or(path);
    path.replace('\\', "/")
}

/// The quoted data directory, or `""` when the script uses `pwd` or has
/// no such statement.
pub fn read_data_dir(text: &str) -> String {
    first_live(text, DATA_DIR_KEY)
        .and_then(|a| parse_script_string(&a.raw))
        .map(|path| normalize_path(&path))
        .unwrap_or_default()
}

/// Point the script at `path`; an empty path selects the working directory.
pub fn write_data_dir(text: &str, path: &str) -> EditResult<String> {
    let path = normalize_path(path);
    let raw = if path.is_empty() {
        "pwd".to_string()
    } else {
        quote_script(&path)
    };
    replace_value(text, DATA_DIR_KEY, &raw)
}

/// Span of the quoted argument of the toolbox `addpath` call.
///
/// The first call mentioning the toolbox by name is preferred; otherwise
/// the first call in code.
fn toolbox_addpath(text: &str) -> Option<(Span, String)> {
    let table = ScanTable::build(text, Syntax::Script);
    let calls: Vec<_> = ADDPATH
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let path = caps.name("path")?;
            table
                .is_code(whole.start())
                .then(|| (Span::new(path.start() - 1, path.end() + 1), path.as_str()))
        })
        .collect();
    calls
        .iter()
        .find(|(_, path)| path.to_ascii_lowercase().contains("fieldtrip"))
        .or_else(|| calls.first())
        .map(|(span, path)| (*span, path.replace("''", "'")))
}

pub fn read_toolbox_path(text: &str) -> String {
    toolbox_addpath(text)
        .map(|(_, path)| path)
        .unwrap_or_else(|| DEFAULT_TOOLBOX_PATH.to_string())
}

pub fn write_toolbox_path(text: &str, path: &str) -> EditResult<String> {
    let (span, _) =
        toolbox_addpath(text).ok_or_else(|| EditError::not_found("toolbox addpath call"))?;
    Ok(splice(text, span, &quote_script(&normalize_path(path))))
}

pub fn read_channels(text: &str, tokens: &BoolTokens) -> Vec<String> {
    match read_keyed(text, &keyed::ACCEPTED_CHANNELS, tokens) {
        ScriptValue::StringArray(items) => items,
        _ => keyed::default_channels(),
    }
}

pub fn write_channels(text: &str, channels: &[String], tokens: &BoolTokens) -> EditResult<String> {
    write_keyed(
        text,
        &keyed::ACCEPTED_CHANNELS,
        &ScriptValue::StringArray(channels.to_vec()),
        tokens,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = "\
% addpath('C:/old/toolbox');
addpath('C:/tools/helpers');
addpath('C:/Program Files/FieldTrip');
ft_defaults;
data_dir = pwd;
accepted_channels = {'Fz', 'Cz'};
";

    #[test]
    fn data_dir_round_trip() {
        assert_eq!(read_data_dir(PIPELINE), "");
        let out = write_data_dir(PIPELINE, "file:///D:\\eeg\\session 1").unwrap();
        assert!(out.contains("data_dir = 'D:/eeg/session 1';\n"));
        assert_eq!(read_data_dir(&out), "D:/eeg/session 1");
        let back = write_data_dir(&out, "").unwrap();
        assert_eq!(back, PIPELINE);
    }

    #[test]
    fn toolbox_call_is_preferred_over_other_addpaths() {
        assert_eq!(read_toolbox_path(PIPELINE), "C:/Program Files/FieldTrip");
        let out = write_toolbox_path(PIPELINE, "E:\\fieldtrip-2024").unwrap();
        assert!(out.contains("addpath('E:/fieldtrip-2024');"));
        assert!(out.contains("addpath('C:/tools/helpers');"));
        assert!(out.starts_with("% addpath('C:/old/toolbox');"));
    }

    #[test]
    fn toolbox_path_defaults_when_absent() {
        assert_eq!(read_toolbox_path("x = 1;\n"), DEFAULT_TOOLBOX_PATH);
        assert!(write_toolbox_path("x = 1;\n", "C:/ft").is_err());
    }

    #[test]
    fn channels_are_comma_joined() {
        let tokens = BoolTokens::default();
        assert_eq!(read_channels(PIPELINE, &tokens), vec!["Fz", "Cz"]);
        let channels = ["O1".to_string(), "O2".to_string(), "Pz".to_string()];
        let out = write_channels(PIPELINE, &channels, &tokens).unwrap();
        assert!(out.contains("accepted_channels = {'O1', 'O2', 'Pz'};"));
        let cleared = write_channels(&out, &[], &tokens).unwrap();
        assert!(cleared.contains("accepted_channels = {};"));
        assert_eq!(read_channels(&cleared, &tokens), Vec::<String>::new());
    }
}
