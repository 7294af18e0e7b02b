//! Convolutional layer configuration mirrored between the classifier
//! source list literal and the classification page markup.

use ep_core::{EditError, EditResult, Syntax, first_list_literal_span, pylit};
use ep_markup::{ConvLayer, default_layers, read_layer_blocks, write_layer_blocks};
use serde_json::Value;

use crate::document_store::{commit_all, load_document};
use crate::error::AppResult;
use crate::settings::WorkspaceSettings;
use crate::status::StatusSender;

/// Identifier the layer list literal is bound to in the classifier source.
pub const LAYER_MARKER: &str = "CONV_LAYER_SPEC";

const PPRINT_WIDTH: usize = 80;

fn int_field(record: &serde_json::Map<String, Value>, name: &str) -> i64 {
    match record.get(name) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Layers from the first list literal after [`LAYER_MARKER`]. Entries
/// that are not records become the default layer at that position.
pub fn layers_from_source(text: &str) -> EditResult<Vec<ConvLayer>> {
    let span = first_list_literal_span(text, LAYER_MARKER, Syntax::Python)?;
    let Value::Array(entries) = pylit::parse(span.slice(text))? else {
        return Err(EditError::malformed("layer list", span.slice(text)));
    };

    let defaults = default_layers();
    let layers = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::Object(record) => ConvLayer {
                in_channels: int_field(record, "inChannels"),
                out_channels: int_field(record, "outChannels"),
                kernel_size: int_field(record, "kernelSize"),
                padding: int_field(record, "padding"),
            },
            _ => defaults[i % defaults.len()],
        })
        .collect();
    Ok(layers)
}

fn layer_repr(layer: &ConvLayer) -> String {
    // Keys in sorted order, as a Python pretty-printer emits them.
    format!(
        "{{'inChannels': {}, 'kernelSize': {}, 'outChannels': {}, 'padding': {}}}",
        layer.in_channels, layer.kernel_size, layer.out_channels, layer.padding
    )
}

/// Python-style list literal: one line when it fits, otherwise one record
/// per line with a four-space hanging indent.
pub fn format_layer_list(layers: &[ConvLayer]) -> String {
    let items: Vec<String> = layers.iter().map(layer_repr).collect();
    let one_line = format!("[{}]", items.join(", "));
    if one_line.len() <= PPRINT_WIDTH {
        return one_line;
    }
    format!("[   {}]", items.join(",\n    "))
}

/// Layer lists never grow past this many times the default depth.
pub const MAX_LAYER_FACTOR: usize = 4;

/// Pad `layers` up to `len` with the default layer for each position.
fn pad_to(layers: &mut Vec<ConvLayer>, len: usize) {
    let defaults = default_layers();
    while layers.len() < len {
        let index = layers.len().min(defaults.len() - 1);
        layers.push(defaults[index]);
    }
}

pub struct ClassificationService {
    settings: WorkspaceSettings,
    status: StatusSender,
    layers: Vec<ConvLayer>,
}

impl ClassificationService {
    /// Load order: classifier source, then page markup, then defaults.
    pub fn load(settings: WorkspaceSettings, status: StatusSender) -> Self {
        let from_source = load_document(&settings.classifier_source_path)
            .ok()
            .and_then(|doc| match layers_from_source(doc.text()) {
                Ok(layers) => Some(layers),
                Err(e) => {
                    tracing::debug!(error = %e, "no layer list in classifier source");
                    None
                }
            });
        let from_markup = || {
            load_document(&settings.classification_markup_path)
                .ok()
                .and_then(|doc| read_layer_blocks(doc.text()).ok())
                .filter(|layers| !layers.is_empty())
        };

        let mut layers = from_source
            .or_else(from_markup)
            .unwrap_or_else(default_layers);
        pad_to(&mut layers, default_layers().len());

        Self {
            settings,
            status,
            layers,
        }
    }

    pub fn layers(&self) -> &[ConvLayer] {
        &self.layers
    }

    /// Set the layer at `index`, padding with defaults up to it. Indices at
    /// or past [`MAX_LAYER_FACTOR`] times the default depth are rejected.
    pub fn update_layer(&mut self, index: usize, layer: ConvLayer) -> bool {
        let limit = default_layers().len() * MAX_LAYER_FACTOR;
        if index >= limit {
            tracing::warn!(index, limit, "layer index out of range");
            self.status
                .error(format!("Layer index {index} is out of range (limit {limit})"));
            return false;
        }
        pad_to(&mut self.layers, index + 1);
        self.layers[index] = layer;
        self.persist()
    }

    pub fn reset_to_defaults(&mut self) -> bool {
        self.layers = default_layers();
        self.persist()
    }

    fn persist(&self) -> bool {
        match self.try_persist() {
            Ok(()) => {
                self.status.info("Layer configuration saved");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "saving layer configuration failed");
                self.status.error(format!("Saving layer configuration failed: {e}"));
                false
            }
        }
    }

    fn try_persist(&self) -> AppResult<()> {
        let mut markup = load_document(&self.settings.classification_markup_path)?;
        let mut source = load_document(&self.settings.classifier_source_path)?;
        markup.edit(|text| write_layer_blocks(text, &self.layers))?;
        source.edit(|text| {
            ep_core::replace_list_literal(
                text,
                LAYER_MARKER,
                &format_layer_list(&self.layers),
                Syntax::Python,
            )
        })?;
        commit_all(&mut [&mut markup, &mut source], self.settings.atomic_commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
import torch

CONV_LAYER_SPEC: List[dict] = [
    {\"inChannels\": 1, \"outChannels\": 8, \"kernelSize\": 3, \"padding\": 1},
    \"not a layer\",
] + [
    {\"inChannels\": 64, \"outChannels\": 128, \"kernelSize\": 5, \"padding\": 2}
    for _ in range(12)
]
";

    #[test]
    fn first_literal_is_read_and_non_records_fall_back() {
        let layers = layers_from_source(SOURCE).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0], ConvLayer::new(1, 8, 3, 1));
        assert_eq!(layers[1], ConvLayer::new(64, 128, 5, 2));
    }

    #[test]
    fn pretty_list_format() {
        let short = format_layer_list(&[ConvLayer::new(3, 32, 3, 0)]);
        assert_eq!(
            short,
            "[{'inChannels': 3, 'kernelSize': 3, 'outChannels': 32, 'padding': 0}]"
        );
        let long = format_layer_list(&default_layers()[..2]);
        assert_eq!(
            long,
            "[   {'inChannels': 3, 'kernelSize': 3, 'outChannels': 32, 'padding': 0},\n    {'inChannels': 64, 'kernelSize': 5, 'outChannels': 128, 'padding': 2}]"
        );
    }

    #[test]
    fn pad_uses_positional_defaults() {
        let mut layers = vec![ConvLayer::new(9, 9, 9, 9)];
        pad_to(&mut layers, 3);
        assert_eq!(layers[1], ConvLayer::new(64, 128, 5, 2));
        assert_eq!(layers.len(), 3);
    }
}
