//! Navigation and page-source operations.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};

use super::Session;

// ============================================================================
// Constants
// ============================================================================

/// Default budget for a blocking navigation.
const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Session - Navigation
// ============================================================================

impl Session {
    /// Navigates to a URL and blocks until the page's load event fires.
    ///
    /// The load-event subscription is armed *before* the navigate call is
    /// dispatched, so a page that finishes loading faster than the caller
    /// can react is still observed. A load event from a previous navigation
    /// cannot satisfy the wait.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to navigate to
    /// * `budget` - Wait budget; defaults to 30s
    ///
    /// # Errors
    ///
    /// - [`Error::NavigationTimeout`] if the load event did not fire in
    ///   time; the session stays usable and the navigation is not cancelled
    /// - [`Error::Remote`] if the browser rejected the navigation
    pub async fn navigate_and_wait(&self, url: &str, budget: Option<Duration>) -> Result<()> {
        let budget = budget.unwrap_or(DEFAULT_NAVIGATION_TIMEOUT);
        debug!(url, budget_ms = budget.as_millis() as u64, "Navigating");

        // Subscribe first; dispatching first is a lost-event race.
        let token = self.inner.synchronizer.arm("Page.loadEventFired", None)?;

        self.call("Page.navigate", json!({ "url": url })).await?;

        match token.wait(budget).await {
            Ok(_) => {
                debug!(url, "Navigation complete");
                Ok(())
            }
            Err(Error::EventTimeout { timeout_ms, .. }) => {
                Err(Error::navigation_timeout(url, timeout_ms))
            }
            Err(other) => Err(other),
        }
    }

    /// Navigates to a URL without waiting for load completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if the browser rejected the navigation.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url, "Navigating (no wait)");
        self.call("Page.navigate", json!({ "url": url })).await?;
        Ok(())
    }

    /// Returns the URL of the current history entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the history response is malformed.
    pub async fn current_url(&self) -> Result<String> {
        let history = self.call("Page.getNavigationHistory", Value::Null).await?;

        let index = history["currentIndex"]
            .as_u64()
            .ok_or_else(|| Error::protocol("navigation history has no currentIndex"))?;

        let url = history["entries"]
            .get(index as usize)
            .and_then(|entry| entry["url"].as_str())
            .ok_or_else(|| Error::protocol("navigation history entry has no url"))?;

        Ok(url.to_string())
    }

    /// Returns the page source as originally received over the network.
    ///
    /// Reads the main frame's resource content; contrast with
    /// [`Self::rendered_source`], which reflects DOM mutations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the resource tree or content response
    /// is malformed.
    pub async fn current_source(&self) -> Result<String> {
        let tree = self.call("Page.getResourceTree", Value::Null).await?;

        let frame = &tree["frameTree"]["frame"];
        let frame_id = frame["id"]
            .as_str()
            .ok_or_else(|| Error::protocol("resource tree has no main frame id"))?;
        let frame_url = frame["url"]
            .as_str()
            .ok_or_else(|| Error::protocol("resource tree has no main frame url"))?;

        let content = self
            .call(
                "Page.getResourceContent",
                json!({ "frameId": frame_id, "url": frame_url }),
            )
            .await?;

        let body = content["content"]
            .as_str()
            .ok_or_else(|| Error::protocol("resource content is not a string"))?;

        if content["base64Encoded"].as_bool().unwrap_or(false) {
            let bytes = BASE64
                .decode(body)
                .map_err(|e| Error::protocol(format!("resource content is not base64: {e}")))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            Ok(body.to_string())
        }
    }

    /// Returns the current DOM serialized to HTML.
    ///
    /// Evaluates `document.documentElement.outerHTML`, so script-driven
    /// mutations are included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if evaluation threw.
    pub async fn rendered_source(&self) -> Result<String> {
        let value = self.evaluate("document.documentElement.outerHTML").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Evaluates a JavaScript expression in the page and returns its value.
    ///
    /// # Errors
    ///
    /// A thrown exception surfaces as [`Error::Remote`] carrying the
    /// exception description.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        debug!(expression_len = expression.len(), "Evaluating expression");

        let outcome = self
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;

        if let Some(details) = outcome.get("exceptionDetails") {
            let description = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("script threw");
            return Err(Error::remote(0, description));
        }

        Ok(outcome["result"]["value"].clone())
    }

    /// Answers an open JavaScript dialog (alert, confirm, prompt).
    ///
    /// Pair with a [`Self::wait_for_event`] on `Page.javascriptDialogOpening`
    /// to observe the dialog first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if no dialog is open.
    pub async fn handle_dialog(&self, accept: bool, prompt_text: Option<&str>) -> Result<()> {
        let mut args = json!({ "accept": accept });
        if let Some(text) = prompt_text {
            args["promptText"] = json!(text);
        }

        self.call("Page.handleJavaScriptDialog", args).await?;
        Ok(())
    }
}
