//! ep-core: text primitives for editing host files in place.
//!
//! Contains:
//! - span (byte-offset spans + splice)
//! - document (the `HostDocument` value object)
//! - scan (string/comment aware delimiter table per host syntax)
//! - literal (numeric, string and list literal codecs)
//! - splice (depth-scanned list literal substitution)
//! - pylit (reader for Python-style data literals)
//! - error (shared edit error taxonomy)

pub mod document;
pub mod error;
pub mod literal;
pub mod pylit;
pub mod scan;
pub mod span;
pub mod splice;

pub use document::HostDocument;
pub use error::{EditError, EditResult};
pub use literal::FloatFormat;
pub use scan::{ScanTable, Syntax};
pub use span::Span;
pub use splice::{first_list_literal_span, list_literal_span, replace_list_literal};
