//! Browser error types - re-exports the unified VeridocError from veridoc-core
//!
//! All browser failures use the `Browser` variant (launch, navigation, CDP,
//! element waits) or the `Evidence` variant (capture and composition). Error
//! messages carry the selector or URL that was involved.

pub use veridoc_core::{Result, VeridocError};
