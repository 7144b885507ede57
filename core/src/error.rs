//! Error taxonomy for admin API calls.
//!
//! # Design
//! Every failure a call can surface is one of a small set of kinds, each
//! carrying the actionable guidance the CLI prints verbatim. A socket timeout
//! while draining the response body is deliberately NOT represented here: it
//! is recovered locally by the response analyzer (see `response::drain`) and
//! the call returns an absent body instead of an error.

use thiserror::Error;

/// A classified, fatal failure of one request/response cycle.
#[derive(Debug, Error)]
pub enum RestError {
    /// The supplied URL could not be parsed into a request.
    #[error("an error has occurred while trying to resolve the given url: {url}\n{reason}")]
    UrlResolution { url: String, reason: String },

    /// Secure transport could not be negotiated with the remote host.
    #[error("the host you are trying to reach does not support SSL")]
    TlsUnsupported,

    /// The connection could not be established within the fixed connect
    /// timeout.
    #[error("{0}")]
    ConnectTimeout(String),

    /// DNS lookup of the request host failed.
    #[error("the host of the specified URL: {url} could not be found.\n\
             Please make sure you have specified the correct path. The default should be:\n\
             http://myhost:8081/artifactory/api/system")]
    UnknownHost { url: String },

    /// The host resolved but no route to it exists.
    #[error("cannot reach: {url}.\n\
             Please make sure that the address is valid and that the port is open \
             (firewall, router, etc').")]
    NoRouteToHost { url: String },

    /// The host actively refused the connection.
    #[error("cannot connect to: {url}. \
             Please make sure to specify a valid host (--host <host>:<port>) \
             or URL (--url http://...).")]
    ConnectionRefused { url: String },

    /// The response status differed from the expected one.
    #[error("unexpected response status for request: {url}\n\
             Expected status: {expected} ({})\n\
             Received status: {received} ({})", reason_text(.expected), reason_text(.received))]
    StatusMismatch {
        url: String,
        expected: u16,
        received: u16,
    },

    /// The response content-type does not contain the expected substring.
    #[error("HTTP content type was {actual} and should be {expected} for request on {url}")]
    ContentTypeMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    /// Any other transport or I/O failure.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Canonical reason phrase for a status code, for human-readable mismatch
/// messages.
fn reason_text(code: &u16) -> &'static str {
    ureq::http::StatusCode::from_u16(*code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown")
}
