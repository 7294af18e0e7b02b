//! Editing direct properties of an element identified by its id.

use ep_core::span::splice;
use ep_core::{EditError, EditResult, ScanTable, Syntax};
use serde::{Deserialize, Serialize};

use crate::block::{PropertySite, PropertyValue, direct_properties, element_body};

fn site(text: &str, table: &ScanTable, id: &str, name: &str) -> EditResult<PropertySite> {
    let body = element_body(text, table, id)?;
    direct_properties(text, table, body)
        .into_iter()
        .find(|site| site.name == name)
        .ok_or_else(|| EditError::not_found(format!("property `{name}` of `{id}`")))
}

pub fn get_block_property(text: &str, id: &str, name: &str) -> EditResult<PropertyValue> {
    let table = ScanTable::build(text, Syntax::Markup);
    let site = site(text, &table, id, name)?;
    Ok(PropertyValue::parse(site.value.slice(text)))
}

/// Replace the value of a property declared directly in the element
/// carrying `id: <id>`. Properties of nested children are never touched.
pub fn set_block_property(
    text: &str,
    id: &str,
    name: &str,
    value: &PropertyValue,
) -> EditResult<String> {
    let table = ScanTable::build(text, Syntax::Markup);
    let site = site(text, &table, id, name)?;
    Ok(splice(text, site.value, &value.to_markup()))
}

pub fn set_dropdown_state(text: &str, id: &str, state: &str) -> EditResult<String> {
    set_block_property(text, id, "dropdownState", &PropertyValue::String(state.to_string()))
}

pub fn set_current_index(text: &str, id: &str, index: i64) -> EditResult<String> {
    set_block_property(text, id, "currentIndex", &PropertyValue::Int(index))
}

/// Range sliders that are part of the fixed page layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedSlider {
    Baseline,
    PrestimPoststim,
    Dftfreq,
}

impl FixedSlider {
    pub const ALL: [FixedSlider; 3] = [
        FixedSlider::Baseline,
        FixedSlider::PrestimPoststim,
        FixedSlider::Dftfreq,
    ];

    pub fn id(self) -> &'static str {
        match self {
            FixedSlider::Baseline => "baselineSlider",
            FixedSlider::PrestimPoststim => "prestimPoststimSlider",
            FixedSlider::Dftfreq => "dftfreqSlider",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderValues {
    pub from: f64,
    pub to: f64,
    pub first_value: f64,
    pub second_value: f64,
}

impl SliderValues {
    fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("from", self.from),
            ("to", self.to),
            ("firstValue", self.first_value),
            ("secondValue", self.second_value),
        ]
    }
}

pub fn read_slider(text: &str, slider: FixedSlider) -> EditResult<SliderValues> {
    let number = |name: &str| -> EditResult<f64> {
        let value = get_block_property(text, slider.id(), name)?;
        value
            .as_f64()
            .ok_or_else(|| EditError::malformed("number", value.to_markup()))
    };
    Ok(SliderValues {
        from: number("from")?,
        to: number("to")?,
        first_value: number("firstValue")?,
        second_value: number("secondValue")?,
    })
}

/// Write all four values; nothing is written unless every one is found.
pub fn write_slider(text: &str, slider: FixedSlider, values: &SliderValues) -> EditResult<String> {
    let mut out = text.to_string();
    for (name, value) in values.fields() {
        out = set_block_property(&out, slider.id(), name, &PropertyValue::Float(value))?;
    }
    Ok(out)
}
