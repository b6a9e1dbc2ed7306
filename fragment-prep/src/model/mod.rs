//! Data model shared across the fragmenting pipeline.

mod fragment;

pub use fragment::{Fragment, FragmentId, FragmentKind};
