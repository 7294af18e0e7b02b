//! Convolutional layer blocks of the classifier page.

use std::sync::LazyLock;

use ep_core::span::splice;
use ep_core::{EditError, EditResult, ScanTable, Span, Syntax};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::{ComponentBlock, direct_properties};

pub const LAYER_KEYWORD: &str = "ConvolutionalLayer2D";

static LAYER_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*ConvolutionalLayer2D[ \t]*(?P<brace>\{)")
        .expect("LAYER_OPENER is a valid static regex pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvLayer {
    pub in_channels: i64,
    pub out_channels: i64,
    pub kernel_size: i64,
    pub padding: i64,
}

impl ConvLayer {
    pub const fn new(in_channels: i64, out_channels: i64, kernel_size: i64, padding: i64) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size,
            padding,
        }
    }

    fn fields(&self) -> [(&'static str, i64); 4] {
        [
            ("inChannels", self.in_channels),
            ("outChannels", self.out_channels),
            ("kernelSize", self.kernel_size),
            ("padding", self.padding),
        ]
    }
}

/// One input layer followed by twelve identical hidden layers.
pub fn default_layers() -> Vec<ConvLayer> {
    let mut layers = vec![ConvLayer::new(3, 32, 3, 0)];
    layers.extend(std::iter::repeat_n(ConvLayer::new(64, 128, 5, 2), 12));
    layers
}

fn layer_bodies(text: &str, table: &ScanTable) -> EditResult<Vec<Span>> {
    let mut bodies = Vec::new();
    for caps in LAYER_OPENER.captures_iter(text) {
        let Some(brace) = caps.name("brace") else {
            continue;
        };
        if !table.is_code(brace.start()) {
            continue;
        }
        let close = table
            .matching_close(brace.start())
            .map_err(|_| EditError::unbalanced(LAYER_KEYWORD, brace.start()))?;
        bodies.push(Span::new(brace.start(), close + 1));
    }
    Ok(bodies)
}

/// Layers declared in the markup, in text order. A property the block
/// does not declare reads as 0.
pub fn read_layer_blocks(text: &str) -> EditResult<Vec<ConvLayer>> {
    let table = ScanTable::build(text, Syntax::Markup);
    Ok(layer_bodies(text, &table)?
        .into_iter()
        .map(|body| {
            let block = ComponentBlock::parse(text, &table, body);
            let int = |name: &str| block.get(name).and_then(|value| value.as_i64()).unwrap_or(0);
            ConvLayer {
                in_channels: int("inChannels"),
                out_channels: int("outChannels"),
                kernel_size: int("kernelSize"),
                padding: int("padding"),
            }
        })
        .collect())
}

/// Rewrite the numeric properties of existing layer blocks in order.
/// Blocks beyond `layers` and properties a block does not declare are
/// left alone; no blocks are added.
pub fn write_layer_blocks(text: &str, layers: &[ConvLayer]) -> EditResult<String> {
    let table = ScanTable::build(text, Syntax::Markup);
    let bodies = layer_bodies(text, &table)?;
    if bodies.is_empty() {
        return Err(EditError::not_found(format!("{LAYER_KEYWORD} blocks")));
    }

    let mut edits: Vec<(Span, String)> = Vec::new();
    for (body, layer) in bodies.into_iter().zip(layers) {
        let sites = direct_properties(text, &table, body);
        for (name, value) in layer.fields() {
            if let Some(site) = sites.iter().find(|site| site.name == name) {
                edits.push((site.value, value.to_string()));
            }
        }
    }

    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = text.to_string();
    for (span, replacement) in edits {
        out = splice(&out, span, &replacement);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
Column {
    ConvolutionalLayer2D {
        inChannels: 3
        outChannels: 32
        kernelSize: 3
        padding: 0
    }
    // ConvolutionalLayer2D { inChannels: 99 }
    ConvolutionalLayer2D {
        inChannels: 32
        outChannels: 64
        kernelSize: 5
        Text { padding: 7 }
    }
}
";

    #[test]
    fn defaults_have_thirteen_layers() {
        let layers = default_layers();
        assert_eq!(layers.len(), 13);
        assert_eq!(layers[0], ConvLayer::new(3, 32, 3, 0));
        assert_eq!(layers[12], ConvLayer::new(64, 128, 5, 2));
    }

    #[test]
    fn reads_blocks_in_order() {
        let layers = read_layer_blocks(PAGE).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0], ConvLayer::new(3, 32, 3, 0));
        assert_eq!(layers[1], ConvLayer::new(32, 64, 5, 0));
    }

    #[test]
    fn writes_only_declared_properties() {
        let out = write_layer_blocks(
            PAGE,
            &[ConvLayer::new(1, 16, 7, 3), ConvLayer::new(16, 8, 3, 1)],
        )
        .unwrap();
        assert!(out.contains("        inChannels: 1\n        outChannels: 16\n        kernelSize: 7\n        padding: 3\n"));
        assert!(out.contains("        inChannels: 16\n        outChannels: 8\n        kernelSize: 3\n"));
        assert!(out.contains("Text { padding: 7 }"));
        assert!(out.contains("// ConvolutionalLayer2D { inChannels: 99 }"));
    }

    #[test]
    fn no_blocks_is_not_found() {
        assert!(write_layer_blocks("Item {}\n", &default_layers()).unwrap_err().is_absent());
    }
}
