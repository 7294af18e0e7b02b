//! ep-markup: structural edits of the declarative UI markup.
//!
//! Contains:
//! - block (blocks, direct properties and typed property values)
//! - registry (id-keyed repeatable block families)
//! - families (dropdown and range-slider block content)
//! - property (single property edits and the fixed sliders)
//! - list_edit (membership edits of string-list values)
//! - layers (convolutional layer blocks)

pub mod block;
pub mod families;
pub mod layers;
pub mod list_edit;
pub mod property;
pub mod registry;

pub use block::{ComponentBlock, PropertySite, PropertyValue};
pub use families::{DROPDOWN_FAMILY, DropdownSpec, RANGE_SLIDER_FAMILY, RangeSliderSpec};
pub use layers::{ConvLayer, default_layers, read_layer_blocks, write_layer_blocks};
pub use list_edit::{ListTarget, add_list_item, read_list, remove_list_item};
pub use property::{
    FixedSlider, SliderValues, get_block_property, read_slider, set_block_property,
    set_current_index, set_dropdown_state, write_slider,
};
pub use registry::{
    BlockFamily, BlockSpec, CONTAINER_ID, LocatedBlock, delete_block, fetch_block, list_blocks,
    locate_family, update_block, upsert_block,
};
