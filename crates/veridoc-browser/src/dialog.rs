//! Native browser dialog interception
//!
//! One portal signals a bad credential number through a blocking
//! `window.alert` rather than DOM state. The watcher subscribes to CDP dialog
//! events *before* the triggering action; the listener records the message
//! and closes the dialog on the spot, because an open alert holds the
//! renderer and would stall the triggering click's round trip.

use crate::browser::BrowserSession;
use crate::error::Result;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Page;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use veridoc_core::VeridocError;

/// One-shot capture of a native dialog's message.
pub struct DialogWatcher {
    message: Arc<Mutex<Option<String>>>,
}

impl DialogWatcher {
    /// Register the dialog listener on the session's tab. Must be called
    /// before the action that may raise the dialog; dismissal happens inside
    /// the listener, not at the call site.
    pub fn arm(session: &BrowserSession) -> Result<Self> {
        let message: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&message);
        let tab = Arc::clone(session.tab());

        session
            .tab()
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageJavascriptDialogOpening(ev) = event {
                    debug!("Native dialog opened: {}", ev.params.message);
                    record_first(&captured, &ev.params.message);
                    if let Err(e) = tab.call_method(Page::HandleJavaScriptDialog {
                        accept: true,
                        prompt_text: None,
                    }) {
                        warn!("Failed to dismiss native dialog: {e}");
                    }
                }
            }))
            .map_err(|e| {
                VeridocError::Browser(format!("Failed to register dialog listener: {e}"))
            })?;

        Ok(Self { message })
    }

    /// The captured message, if a dialog has fired.
    pub fn message(&self) -> Option<String> {
        self.message.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Keep the first message; portals re-alert on retry.
fn record_first(slot: &Mutex<Option<String>>, message: &str) {
    if let Ok(mut slot) = slot.lock() {
        slot.get_or_insert_with(|| message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_wins() {
        let slot = Mutex::new(None);
        record_first(&slot, "유효하지 않은 번호입니다.");
        record_first(&slot, "다시 확인해 주세요.");
        assert_eq!(
            slot.lock().unwrap().as_deref(),
            Some("유효하지 않은 번호입니다.")
        );
    }
}
