//! The two user-created block families of the preprocessing page.

use ep_core::literal::{escape_markup, format_float, format_markup_list};
use ep_core::FloatFormat;
use serde::{Deserialize, Serialize};

use crate::block::{ComponentBlock, PropertyValue};
use crate::registry::{BlockFamily, BlockSpec};

pub const DROPDOWN_FAMILY: BlockFamily = BlockFamily {
    keyword: "DropdownTemplate",
    prefix: "customDropdown",
    key_property: "matlabProperty",
};

pub const RANGE_SLIDER_FAMILY: BlockFamily = BlockFamily {
    keyword: "RangeSliderTemplate",
    prefix: "customRangeSlider",
    key_property: "matlabProperty",
};

/// Bound script keys always live under `cfg.`.
pub fn normalize_property(property: &str) -> String {
    let property = property.trim();
    if property.is_empty() || property.starts_with("cfg.") {
        property.to_string()
    } else {
        format!("cfg.{property}")
    }
}

fn display_label(label: &str, id: &str) -> String {
    match label.trim() {
        "" => id.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", escape_markup(value))
}

fn string_prop(block: &ComponentBlock, name: &str) -> Option<String> {
    block.get(name).and_then(PropertyValue::as_str).map(str::to_string)
}

fn list_prop(block: &ComponentBlock, name: &str) -> Vec<String> {
    block
        .get(name)
        .and_then(PropertyValue::as_list)
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

fn float_prop(block: &ComponentBlock, name: &str) -> Option<f64> {
    block.get(name).and_then(PropertyValue::as_f64)
}

fn number(value: f64) -> String {
    format_float(value, FloatFormat::Shortest)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropdownSpec {
    pub label: String,
    pub matlab_property: String,
    pub is_multi_select: bool,
    pub max_selections: i64,
    pub all_items: Vec<String>,
    pub selected_items: Vec<String>,
}

impl BlockSpec for DropdownSpec {
    fn family() -> BlockFamily {
        DROPDOWN_FAMILY
    }

    fn key(&self) -> String {
        normalize_property(&self.matlab_property)
    }

    fn lines(&self, id: &str) -> Vec<String> {
        let label = quoted(&display_label(&self.label, id));
        let property = quoted(&self.key());
        let all_items = format_markup_list(&self.all_items);
        let model = if self.is_multi_select {
            "[]".to_string()
        } else {
            all_items.clone()
        };
        vec![
            format!("id: {id}"),
            format!("property string persistentId: \"{id}\""),
            format!("property string customLabel: {label}"),
            "property bool persistenceConnected: false".to_string(),
            format!("label: {label}"),
            format!("matlabProperty: {property}"),
            format!("matlabPropertyDraft: {property}"),
            "hasAddFeature: true".to_string(),
            format!("isMultiSelect: {}", self.is_multi_select),
            format!("maxSelections: {}", self.max_selections),
            format!("model: {model}"),
            format!("allItems: {all_items}"),
            format!("selectedItems: {}", format_markup_list(&self.selected_items)),
            "addPlaceholder: \"Add option...\"".to_string(),
            "dropdownState: \"default\"".to_string(),
            "anchors.left: parent.left".to_string(),
        ]
    }

    fn from_block(block: &ComponentBlock) -> Option<Self> {
        Some(Self {
            label: string_prop(block, "label").or_else(|| string_prop(block, "customLabel"))?,
            matlab_property: string_prop(block, "matlabProperty")?,
            is_multi_select: block
                .get("isMultiSelect")
                .and_then(PropertyValue::as_bool)
                .unwrap_or(false),
            max_selections: block
                .get("maxSelections")
                .and_then(PropertyValue::as_i64)
                .unwrap_or(1),
            all_items: list_prop(block, "allItems"),
            selected_items: list_prop(block, "selectedItems"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSliderSpec {
    pub label: String,
    pub matlab_property: String,
    pub from: f64,
    pub to: f64,
    pub first_value: f64,
    pub second_value: f64,
    pub step_size: f64,
    pub unit: String,
}

impl BlockSpec for RangeSliderSpec {
    fn family() -> BlockFamily {
        RANGE_SLIDER_FAMILY
    }

    fn key(&self) -> String {
        normalize_property(&self.matlab_property)
    }

    fn lines(&self, id: &str) -> Vec<String> {
        let label = quoted(&display_label(&self.label, id));
        vec![
            format!("id: {id}"),
            format!("property string persistentId: \"{id}\""),
            format!("property string customLabel: {label}"),
            "property bool persistenceConnected: false".to_string(),
            format!("label: {label}"),
            format!("matlabProperty: {}", quoted(&self.key())),
            format!("from: {}", number(self.from)),
            format!("to: {}", number(self.to)),
            format!("firstValue: {}", number(self.first_value)),
            format!("secondValue: {}", number(self.second_value)),
            format!("stepSize: {}", number(self.step_size)),
            format!("unit: {}", quoted(&self.unit)),
            "sliderState: \"default\"".to_string(),
            "sliderId: \"\"".to_string(),
            "matlabPropertyDraft: \"\"".to_string(),
            "anchors.left: parent.left".to_string(),
        ]
    }

    fn from_block(block: &ComponentBlock) -> Option<Self> {
        Some(Self {
            label: string_prop(block, "label").or_else(|| string_prop(block, "customLabel"))?,
            matlab_property: string_prop(block, "matlabProperty")?,
            from: float_prop(block, "from")?,
            to: float_prop(block, "to")?,
            first_value: float_prop(block, "firstValue")?,
            second_value: float_prop(block, "secondValue")?,
            step_size: float_prop(block, "stepSize").unwrap_or(0.1),
            unit: string_prop(block, "unit").unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{fetch_block, list_blocks, upsert_block};

    const PAGE: &str = "\
Item {
    Column {
        id: customDropdownContainer
        spacing: 8
    }
}
";

    fn dropdown(property: &str) -> DropdownSpec {
        DropdownSpec {
            label: "Channels \"main\"".into(),
            matlab_property: property.into(),
            is_multi_select: true,
            max_selections: 4,
            all_items: vec!["Fz".into(), "".into(), "Cz".into()],
            selected_items: vec!["Fz".into()],
        }
    }

    #[test]
    fn dropdown_serializes_with_escapes_and_boilerplate() {
        let (out, id) = upsert_block(PAGE, &dropdown("channel")).unwrap();
        assert_eq!(id, "customDropdown1");
        assert!(out.contains("        DropdownTemplate {\n            id: customDropdown1\n"));
        assert!(out.contains("            label: \"Channels \\\"main\\\"\"\n"));
        assert!(out.contains("            matlabProperty: \"cfg.channel\"\n"));
        assert!(out.contains("            model: []\n"));
        assert!(out.contains("            allItems: [\"Fz\", \"Cz\"]\n"));
        assert!(out.contains("            anchors.left: parent.left\n        }\n    }\n}\n"));

        let back: DropdownSpec = fetch_block(&out, "customDropdown1").unwrap();
        assert_eq!(back.label, "Channels \"main\"");
        assert_eq!(back.matlab_property, "cfg.channel");
        assert_eq!(back.all_items, vec!["Fz", "Cz"]);
    }

    #[test]
    fn same_property_upserts_instead_of_duplicating() {
        let (out, first) = upsert_block(PAGE, &dropdown("cfg.channel")).unwrap();
        let mut changed = dropdown("channel");
        changed.max_selections = 2;
        let (out, second) = upsert_block(&out, &changed).unwrap();
        assert_eq!(first, second);
        let all = list_blocks::<DropdownSpec>(&out).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].1.max_selections, 2);
    }

    #[test]
    fn range_slider_round_trips() {
        let slider = RangeSliderSpec {
            label: "".into(),
            matlab_property: "cfg.latency".into(),
            from: -1.0,
            to: 2.5,
            first_value: -0.2,
            second_value: 0.8,
            step_size: 0.1,
            unit: "s".into(),
        };
        let (out, id) = upsert_block(PAGE, &slider).unwrap();
        assert_eq!(id, "customRangeSlider1");
        assert!(out.contains("label: \"customRangeSlider1\"\n"));
        let back: RangeSliderSpec = fetch_block(&out, &id).unwrap();
        assert_eq!(
            back,
            RangeSliderSpec {
                label: "customRangeSlider1".into(),
                ..slider
            }
        );
    }
}
