//! Browser session lifecycle using the Chrome DevTools Protocol
//!
//! Each work item gets its own isolated browser process. Several of the
//! target portals probe for automation signatures, so every session launches
//! with the same hardening: blink automation-control disabled, a fixed
//! realistic user agent, and `navigator.webdriver` hidden.

use crate::error::Result;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use veridoc_core::{VeridocConfig, VeridocError};

/// User agent presented to every portal. Matches a stock desktop Chrome so
/// sessions look like the browsers the portals were built for.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const AUTOMATION_FLAG: &str = "--disable-blink-features=AutomationControlled";

/// Poll interval for condition waits
const POLL_MS: u64 = 250;

/// Configuration for a single browser session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Default timeout for element waits, in seconds
    pub timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            timeout_seconds: 30,
        }
    }
}

impl From<&VeridocConfig> for BrowserConfig {
    fn from(config: &VeridocConfig) -> Self {
        Self {
            headless: config.headless,
            window_width: config.window_width,
            window_height: config.window_height,
            ..Self::default()
        }
    }
}

/// One isolated browser process plus its working tab.
///
/// The underlying Chrome process is torn down when the session drops, so
/// holding the session in the adapter-boundary scope guarantees cleanup on
/// every exit path, classified failure and panic included.
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
    /// Configuration
    config: BrowserConfig,
}

impl BrowserSession {
    /// Launch a hardened session with default configuration.
    pub async fn launch() -> Result<Self> {
        Self::launch_with_config(BrowserConfig::default()).await
    }

    /// Launch a hardened session with custom configuration.
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .args(vec![OsStr::new(AUTOMATION_FLAG)])
            .build()
            .map_err(|e| VeridocError::Browser(format!("Failed to build launch options: {e}")))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| VeridocError::Browser(format!("Failed to launch browser: {e}")))?;

        let tab = browser
            .new_tab()
            .map_err(|e| VeridocError::Browser(format!("Failed to create tab: {e}")))?;

        // Suppress the automation markers the portals probe for
        tab.enable_stealth_mode()
            .map_err(|e| VeridocError::Browser(format!("Failed to enable stealth mode: {e}")))?;
        tab.set_user_agent(USER_AGENT, Some("ko-KR,ko;q=0.9,en-US;q=0.8"), None)
            .map_err(|e| VeridocError::Browser(format!("Failed to set user agent: {e}")))?;

        debug!("Browser launched with anti-automation hardening");

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Navigate to a URL and wait for the navigation to complete.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| VeridocError::Browser(format!("Failed to navigate to {url}: {e}")))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| VeridocError::Browser(format!("Navigation timeout for {url}: {e}")))?;

        info!("Navigated to {}", url);
        Ok(())
    }

    /// Wait for a navigation already in flight (started by a click or a
    /// keypress submit) to land. Navigating elsewhere before this returns
    /// cancels the pending load, cookies and all.
    pub async fn wait_for_navigation(&self) -> Result<()> {
        self.tab
            .wait_until_navigated()
            .map_err(|e| VeridocError::Browser(format!("Navigation did not complete: {e}")))?;
        Ok(())
    }

    /// Wait for an element to appear, up to the given timeout (session
    /// default when `None`).
    pub async fn wait_for_element(&self, selector: &str, timeout: Option<Duration>) -> Result<()> {
        let timeout =
            timeout.unwrap_or_else(|| Duration::from_secs(self.config.timeout_seconds));

        debug!("Waiting for element: {} (timeout: {:?})", selector, timeout);

        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|_| VeridocError::Browser(format!("Element not found: {selector}")))?;

        Ok(())
    }

    /// Check whether an element currently exists, without waiting for it.
    pub async fn element_exists(&self, selector: &str) -> bool {
        let script = format!("document.querySelector('{selector}') !== null");
        matches!(
            self.evaluate_script(&script).await,
            Ok(serde_json::Value::Bool(true))
        )
    }

    /// Wait until a JS predicate evaluates truthy, polling up to `timeout`.
    ///
    /// Used where the portal has no stable marker element and the readiness
    /// signal is only expressible as page state (e.g. a conditionally visible
    /// button, a frame's document.readyState).
    pub async fn wait_for_condition(&self, predicate: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(value) = self.evaluate_script(predicate).await {
                if value.as_bool() == Some(true) {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(VeridocError::Browser(format!(
                    "Condition not met within {timeout:?}: {predicate}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(POLL_MS)).await;
        }
    }

    /// Bounded settle delay. Only for portals that report readiness before
    /// they finish painting (JS-rendered viewers), and always after a marker
    /// was already observed.
    pub async fn settle(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    /// Execute JavaScript in the page context and return its JSON value.
    pub async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| VeridocError::Browser(format!("JavaScript evaluation failed: {e}")))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Clear a form field and type a value into it.
    pub async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let clear = format!(
            "const el = document.querySelector('{selector}'); if (el) el.value = '';"
        );
        self.evaluate_script(&clear).await?;

        self.tab
            .find_element(selector)
            .map_err(|_| VeridocError::Browser(format!("Field not found: {selector}")))?
            .type_into(value)
            .map_err(|e| VeridocError::Browser(format!("Failed to type into {selector}: {e}")))?;

        debug!("Filled {}", selector);
        Ok(())
    }

    /// Click an element located by CSS selector.
    pub async fn click(&self, selector: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .map_err(|_| VeridocError::Browser(format!("Element not found: {selector}")))?
            .click()
            .map_err(|e| VeridocError::Browser(format!("Failed to click {selector}: {e}")))?;

        debug!("Clicked {}", selector);
        Ok(())
    }

    /// Click an element through page JavaScript. Some portals gate their
    /// submit buttons behind visibility toggles that defeat a synthetic
    /// pointer click.
    pub async fn click_via_script(&self, selector: &str) -> Result<()> {
        let script = format!(
            "const el = document.querySelector('{selector}'); \
             if (el) {{ el.click(); true }} else {{ false }}"
        );
        match self.evaluate_script(&script).await? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(VeridocError::Browser(format!(
                "Element not found for scripted click: {selector}"
            ))),
        }
    }

    /// Press a key in the focused element (portal convention for submits
    /// without a button, e.g. login forms confirmed with Enter).
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.tab
            .press_key(key)
            .map_err(|e| VeridocError::Browser(format!("Failed to press {key}: {e}")))?;
        Ok(())
    }

    /// Get text content of an element, empty string when absent.
    pub async fn text_content(&self, selector: &str) -> Result<String> {
        let script =
            format!("document.querySelector('{selector}')?.textContent?.trim() ?? ''");
        let result = self.evaluate_script(&script).await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Snapshot of every target id the browser currently tracks. Taken
    /// before an action that opens a popup, so [`wait_for_new_tab`] can tell
    /// the popup apart from pre-existing tabs (the browser's initial
    /// about:blank page is always in this list).
    ///
    /// [`wait_for_new_tab`]: BrowserSession::wait_for_new_tab
    pub fn target_ids(&self) -> Result<Vec<String>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|_| VeridocError::Browser("Browser tab list poisoned".to_string()))?;
        Ok(tabs.iter().map(|t| t.get_target_id().clone()).collect())
    }

    /// Wait up to `timeout` for a tab that was not in the `known` snapshot.
    /// Portals that render the true evidence surface in a popup window go
    /// through this: snapshot, trigger, wait.
    pub async fn wait_for_new_tab(&self, known: &[String], timeout: Duration) -> Result<Arc<Tab>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let tabs = self.browser.get_tabs().lock().map_err(|_| {
                    VeridocError::Browser("Browser tab list poisoned".to_string())
                })?;
                let ids: Vec<String> =
                    tabs.iter().map(|t| t.get_target_id().clone()).collect();
                if let Some(i) = newly_opened_index(known, &ids) {
                    return Ok(Arc::clone(&tabs[i]));
                }
            }
            if Instant::now() >= deadline {
                return Err(VeridocError::Browser(format!(
                    "No popup tab appeared within {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(POLL_MS)).await;
        }
    }

    /// Reference to the active tab, for capture and dialog wiring.
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Close the session. Dropping has the same effect; this exists for
    /// call sites that want the teardown to be visible.
    pub async fn close(self) -> Result<()> {
        debug!("Closing browser session");
        Ok(())
    }
}

/// Index of the first tab in `current` whose id was absent from the `known`
/// snapshot. Identity, not position: Chrome keeps its initial about:blank
/// page in the tab list, so "any tab but mine" would match it.
fn newly_opened_index(known: &[String], current: &[String]) -> Option<usize> {
    current.iter().position(|id| !known.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.window_width, 1920);
        assert_eq!(config.window_height, 1080);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_config_from_run_config() {
        let mut run = VeridocConfig::default();
        run.headless = false;
        run.window_width = 1280;
        let config = BrowserConfig::from(&run);
        assert!(!config.headless);
        assert_eq!(config.window_width, 1280);
        assert_eq!(config.timeout_seconds, 30);
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_popup_detection_ignores_preexisting_tabs() {
        // Launch leaves two tabs around: the initial about:blank page and
        // the session's working tab. Neither is the popup.
        let known = ids(&["initial-blank", "session-tab"]);
        assert_eq!(newly_opened_index(&known, &known), None);

        let after = ids(&["initial-blank", "session-tab", "popup"]);
        assert_eq!(newly_opened_index(&known, &after), Some(2));
    }

    #[test]
    fn test_popup_detection_is_position_independent() {
        let known = ids(&["initial-blank", "session-tab"]);
        let after = ids(&["popup", "initial-blank", "session-tab"]);
        assert_eq!(newly_opened_index(&known, &after), Some(0));
    }

    #[test]
    fn test_user_agent_is_desktop_chrome() {
        assert!(USER_AGENT.contains("Chrome/"));
        assert!(USER_AGENT.contains("Windows NT"));
        assert!(!USER_AGENT.to_lowercase().contains("headless"));
    }
}
