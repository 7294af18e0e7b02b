//! ep-script: configuration values embedded in numerical-script text.
//!
//! Assignment statements (`key = value;`) are located fresh on every call,
//! decoded per value kind, and rewritten by substituting only the value
//! portion. Dependent-flag groups keep an array statement commented out
//! exactly when its boolean flag is off.

pub mod assignment;
pub mod keyed;
pub mod params;
pub mod pipeline;
pub mod toggle;
pub mod value;

pub use assignment::{ParameterAssignment, find_assignments, replace_value};
pub use keyed::{KeySpec, read_keyed, write_keyed};
pub use params::PreprocessingParams;
pub use pipeline::{
    read_channels, read_data_dir, read_toolbox_path, write_channels, write_data_dir,
    write_toolbox_path,
};
pub use toggle::{BASELINE_GROUP, DFT_GROUP, ToggleGroup, read_toggle_group, write_toggle_group};
pub use value::{BoolTokens, ScriptValue, ValueKind};
