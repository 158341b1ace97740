//! Screenshot capture.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};

use super::Session;

// ============================================================================
// ScreenshotFormat
// ============================================================================

/// Image format for screenshot capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenshotFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// JPEG at default quality.
    Jpeg,
}

impl ScreenshotFormat {
    /// Returns the wire name of this format.
    #[inline]
    #[must_use]
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

// ============================================================================
// Session - Screenshot
// ============================================================================

impl Session {
    /// Captures a screenshot of the current page.
    ///
    /// Returns the decoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the capture payload is not valid
    /// base64.
    pub async fn take_screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>> {
        debug!(format = format.as_wire(), "Capturing screenshot");

        let result = self
            .call(
                "Page.captureScreenshot",
                json!({ "format": format.as_wire() }),
            )
            .await?;

        let data = result["data"]
            .as_str()
            .ok_or_else(|| Error::protocol("screenshot response has no data"))?;

        let bytes = BASE64
            .decode(data)
            .map_err(|e| Error::protocol(format!("screenshot data is not base64: {e}")))?;

        debug!(bytes = bytes.len(), "Screenshot captured");
        Ok(bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_wire_names() {
        assert_eq!(ScreenshotFormat::Png.as_wire(), "png");
        assert_eq!(ScreenshotFormat::Jpeg.as_wire(), "jpeg");
    }

    #[test]
    fn test_default_format_is_png() {
        assert_eq!(ScreenshotFormat::default(), ScreenshotFormat::Png);
    }
}
