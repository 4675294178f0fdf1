//! Browser automation for portal-driven credential verification
//!
//! Wraps the Chrome DevTools Protocol (via `headless_chrome`) into the
//! primitives the site adapters need:
//!
//! - [`BrowserSession`]: one hardened, isolated browser process per work
//!   item, torn down on every exit path
//! - Bounded waits: element waits, JS-condition polling, settle delays
//! - [`DialogWatcher`]: native dialog interception for portals that signal
//!   outcomes through `window.alert`
//! - Screenshot capture and the side-by-side evidence composite

pub mod browser;
pub mod dialog;
pub mod error;
pub mod screenshot;

pub use browser::{BrowserConfig, BrowserSession, USER_AGENT};
pub use dialog::DialogWatcher;
pub use error::{Result, VeridocError};
pub use screenshot::{capture_page, capture_tab, compose_side_by_side};
