//! Error types for the attribution module.

use thiserror::Error;

/// Errors that can occur during attribution operations.
///
/// The pipeline itself never surfaces these to its caller; every strategy
/// failure is caught, logged and treated as an empty contribution. They exist
/// so the individual clients and the runner have honest signatures.
#[derive(Debug, Error)]
pub enum AttributionError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Remote API answered with a non-success status.
    #[error("{service} returned status {status}")]
    ApiStatus {
        /// Which remote service answered.
        service: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// HTML parsing error.
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// Headless browser could not be launched or driven.
    #[error("Browser automation error: {0}")]
    Browser(String),

    /// No usable browser executable found on this machine.
    #[error("No Chromium-family browser found; set CHROME_EXECUTABLE")]
    BrowserUnavailable,

    /// Regex error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}
