//! Infer a minimal structural type from sample JSON values.
//!
//! ```
//! use json_shape::inference::Inference;
//! use json_shape::ir::Shape;
//! use json_shape::lower::LowerOptions;
//! use serde_json::json;
//!
//! let mut inf = Inference::new();
//! inf.observe_value(&json!({"id": 1, "tags": ["a"]}));
//! inf.observe_value(&json!({"id": 2}));
//!
//! let lowered = inf.solve(&LowerOptions::default());
//! let tags = lowered.descriptor.field("tags").unwrap();
//! assert!(matches!(tags.descriptor.shape, Shape::Array { .. }));
//! assert!(tags.descriptor.optional);
//! ```
pub mod cli;
pub mod error;
pub mod ident;
pub mod inference;
pub mod ir;
pub mod lower;

pub use error::{Error, Result};
pub use inference::{Inference, Stats};
pub use ir::{Capabilities, Capability, Descriptor, Field, Shape};
pub use lower::{lower, LowerOptions, Lowered, OmitEmpty};
