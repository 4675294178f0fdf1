//! # veridoc-core
//!
//! Core types for the Veridoc bulk credential verification pipeline.
//!
//! A batch of work items (person + document) is verified one item at a time
//! against the issuing institution's own portal. This crate owns the pieces
//! that never touch a browser:
//!
//! - The [`WorkItem`] model and its result lifecycle
//! - The tri-state [`Outcome`] classification and its single point of
//!   application, [`apply_outcome`]
//! - Field normalization shared by dispatch and the adapters
//! - Run configuration and the unified error type

mod config;
mod error;
pub mod normalize;
mod types;

pub use config::{PortalLogin, RequesterInfo, VeridocConfig};
pub use error::{Result, VeridocError};
pub use types::{apply_outcome, BatchSummary, Evidence, Outcome, SummaryRow, WorkItem};
