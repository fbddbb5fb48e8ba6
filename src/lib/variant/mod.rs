//! The shared variant data model: record representation and pre-merge
//! normalization.

pub mod normalize;
pub mod record;

pub use normalize::{normalize, split};
pub use record::{VariantKey, VariantRecord};
