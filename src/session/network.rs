//! Request header control.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::Result;

use super::Session;

// ============================================================================
// Session - Headers
// ============================================================================

impl Session {
    /// Sets extra HTTP headers sent with every subsequent request.
    ///
    /// Headers persist for the lifetime of the session or until replaced by
    /// another call; an empty iterator clears them.
    ///
    /// # Example
    ///
    /// ```ignore
    /// session
    ///     .update_headers([("Accept-Language", "de-DE"), ("X-Client", "tests")])
    ///     .await?;
    /// ```
    pub async fn update_headers<I, K, V>(&self, headers: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: Map<String, Value> = headers
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();

        debug!(count = map.len(), "Updating extra headers");

        self.call(
            "Network.setExtraHTTPHeaders",
            json!({ "headers": Value::Object(map) }),
        )
        .await?;
        Ok(())
    }
}
