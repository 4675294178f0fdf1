//! Per-institution verification adapters and their dispatcher
//!
//! Each target portal has a distinct interaction protocol: selectors,
//! submit conventions, and outcome signals (result tables, modals, native
//! alerts, popup viewers). One adapter module encapsulates each protocol;
//! the dispatcher owns the table from normalized institution label to
//! adapter, plus the fan-out rule for the two institutions whose documents
//! can also be confirmed on gov.kr.
//!
//! Adapters classify to a tri-state [`veridoc_core::Outcome`]; the dispatch
//! boundary absorbs every adapter failure into a failed work item.

pub mod adapter;
pub mod dispatch;

mod dataq;
mod gov;
mod historyexam;
mod korcham;
mod kpc;
mod nhis;
mod nps;
mod opic;
mod semu;

pub use adapter::{AdapterContext, DelayBudget, SiteAdapter};
pub use dispatch::{execute, resolve, AdapterKind};
