//! Dependent-flag groups: a boolean flag and the array statement it gates.

use ep_core::{EditError, EditResult};

use crate::assignment::{find_assignments, rewrite};
use crate::keyed::{self, KeySpec};
use crate::value::{self, BoolTokens, ScriptValue};

#[derive(Debug, Clone, Copy)]
pub struct ToggleGroup {
    pub flag: KeySpec,
    pub array: KeySpec,
}

pub const BASELINE_GROUP: ToggleGroup = ToggleGroup {
    flag: keyed::DEMEAN,
    array: keyed::BASELINE_WINDOW,
};

pub const DFT_GROUP: ToggleGroup = ToggleGroup {
    flag: keyed::DFTFILTER,
    array: keyed::DFTFREQ,
};

/// Write the flag and bring its array statement into the matching form.
///
/// The array line is live when `enabled` and comment-prefixed otherwise.
/// `values` replaces the array value in either form; `None` keeps the
/// value as written. If the text holds both a live and a commented copy,
/// the live one is rewritten and the commented one is left as is.
pub fn write_toggle_group(
    text: &str,
    group: &ToggleGroup,
    enabled: bool,
    values: Option<&[f64]>,
    tokens: &BoolTokens,
) -> EditResult<String> {
    let text = keyed::write_keyed(text, &group.flag, &ScriptValue::Bool(enabled), tokens)?;

    let all = find_assignments(&text, group.array.key)?;
    let live = all.iter().find(|a| !a.is_commented);
    let commented = all.iter().find(|a| a.is_commented);
    if live.is_some() && commented.is_some() {
        tracing::warn!(
            key = group.array.key,
            "both live and commented statements present; rewriting the live one"
        );
    }
    let target = live
        .or(commented)
        .ok_or_else(|| EditError::not_found(format!("assignment to `{}`", group.array.key)))?;

    let raw = match values {
        Some(values) => value::encode(
            &ScriptValue::FloatArray(values.to_vec()),
            group.array.style,
            tokens,
        ),
        None => target.raw.clone(),
    };
    Ok(rewrite(&text, target, !enabled, &raw))
}

/// Current flag value and array value of a group, defaults applied.
pub fn read_toggle_group(text: &str, group: &ToggleGroup, tokens: &BoolTokens) -> (bool, Vec<f64>) {
    let flag = keyed::read_keyed(text, &group.flag, tokens)
        .as_bool()
        .unwrap_or(true);
    let values = keyed::read_keyed(text, &group.array, tokens)
        .as_floats()
        .map(<[f64]>::to_vec)
        .unwrap_or_default();
    (flag, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::first_live;

    const TEXT: &str = "cfg.demean = 'no';\n% cfg.baselinewindow = [-0.2 0];\ncfg.dftfilter = 'yes';\ncfg.dftfreq = [50 60]; % line noise\n";

    fn forms(text: &str, key: &str) -> (usize, usize) {
        let all = find_assignments(text, key).unwrap();
        let live = all.iter().filter(|a| !a.is_commented).count();
        (live, all.len() - live)
    }

    #[test]
    fn enabling_uncomments_and_writes_values() {
        let tokens = BoolTokens::default();
        let out =
            write_toggle_group(TEXT, &BASELINE_GROUP, true, Some(&[-0.1, 0.3]), &tokens).unwrap();
        assert!(out.starts_with("cfg.demean = 'yes';\ncfg.baselinewindow = [-0.1 0.3];\n"));
        assert_eq!(forms(&out, "cfg.baselinewindow"), (1, 0));
    }

    #[test]
    fn disabling_comments_out_and_keeps_inline_comment() {
        let tokens = BoolTokens::default();
        let out = write_toggle_group(TEXT, &DFT_GROUP, false, None, &tokens).unwrap();
        assert!(out.contains("cfg.dftfilter = 'no';\n% cfg.dftfreq = [50 60]; % line noise\n"));
        assert_eq!(forms(&out, "cfg.dftfreq"), (0, 1));
        assert_eq!(read_toggle_group(&out, &DFT_GROUP, &tokens), (false, vec![50.0, 60.0]));
    }

    #[test]
    fn live_copy_wins_when_both_exist() {
        let tokens = BoolTokens::default();
        let text = "cfg.demean = 'yes';\ncfg.baselinewindow = [-0.2 0];\n% cfg.baselinewindow = [-0.5 0];\n";
        let out =
            write_toggle_group(text, &BASELINE_GROUP, true, Some(&[-0.3, 0.0]), &tokens).unwrap();
        assert_eq!(first_live(&out, "cfg.baselinewindow").unwrap().raw, "[-0.3 0.0]");
        assert!(out.ends_with("% cfg.baselinewindow = [-0.5 0];\n"));
    }

    #[test]
    fn missing_flag_or_array_fails_without_output() {
        let tokens = BoolTokens::default();
        let flag_only = "cfg.demean = 'no';\n";
        assert!(write_toggle_group(flag_only, &BASELINE_GROUP, true, None, &tokens).is_err());
        let array_only = "% cfg.baselinewindow = [0 1];\n";
        assert!(write_toggle_group(array_only, &BASELINE_GROUP, true, None, &tokens).is_err());
    }
}
