//! Request descriptor model for admin API calls.
//!
//! # Design
//! A `RequestDescriptor` carries everything one call needs: method, URL,
//! optional body, validation expectations, timeout override, credentials and
//! the echo flag. It is built once with chainable setters and consumed by
//! `client::execute`, so a descriptor can never be mutated after dispatch.
//!
//! Credentials are a tri-state by construction: `Option<Credentials>` keeps
//! "no auth" distinguishable from "auth with an empty username".

use std::fmt;
use std::io::Read;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Path suffixes of the admin REST API, appended to
/// `http://<host>:<port>/artifactory/api/` by the calling commands.
pub const SYSTEM_PATH: &str = "system";
pub const CONFIG_PATH: &str = "system/configuration";
pub const EXPORT_PATH: &str = "export/system";
pub const IMPORT_PATH: &str = "import/system";
pub const SECURITY_PATH: &str = "system/security";
pub const COMPRESS_PATH: &str = "system/storage/compress";

/// HTTP method of an admin request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

/// Basic-auth credentials, sent preemptively with the first request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value for the `Authorization` header.
    pub(crate) fn basic_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request payload for PUT/POST: raw bytes or a single-use reader with a
/// declared length, plus an optional content type.
pub struct RequestBody {
    source: BodySource,
    content_type: Option<String>,
}

pub(crate) enum BodySource {
    Bytes(Vec<u8>),
    Reader {
        reader: Box<dyn Read + Send + Sync>,
        len: u64,
    },
}

impl RequestBody {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: BodySource::Bytes(bytes.into()),
            content_type: None,
        }
    }

    /// Lazily-readable payload. The reader is consumed exactly once, when the
    /// request is dispatched; `len` is sent as the Content-Length.
    pub fn from_reader(reader: impl Read + Send + Sync + 'static, len: u64) -> Self {
        Self {
            source: BodySource::Reader {
                reader: Box::new(reader),
                len,
            },
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_length(&self) -> u64 {
        match &self.source {
            BodySource::Bytes(bytes) => bytes.len() as u64,
            BodySource::Reader { len, .. } => *len,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub(crate) fn into_parts(self) -> (BodySource, Option<String>) {
        (self.source, self.content_type)
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            BodySource::Bytes(_) => "bytes",
            BodySource::Reader { .. } => "reader",
        };
        f.debug_struct("RequestBody")
            .field("kind", &kind)
            .field("content_length", &self.content_length())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// A fully-specified admin request.
///
/// Defaults: expected status 200, no content-type check, default socket
/// timeout (60 s), no credentials, no echo, no body.
#[derive(Debug)]
pub struct RequestDescriptor {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) body: Option<RequestBody>,
    pub(crate) expected_status: u16,
    pub(crate) expected_content_type: Option<String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) echo: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            expected_status: 200,
            expected_content_type: None,
            timeout: None,
            credentials: None,
            echo: false,
        }
    }

    /// Attach a request payload. Only dispatched for PUT/POST; an absent body
    /// sends an empty entity with content length 0.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Substring the response content-type header must contain. A blank value
    /// disables the check.
    pub fn expect_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.expected_content_type = Some(content_type.into());
        self
    }

    /// Socket/read timeout override. The connect timeout is fixed and not
    /// affected by this value.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Mirror the response body to stdout as it is read.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults() {
        let d = RequestDescriptor::new(Method::Get, "http://localhost:8081/artifactory/api/system");
        assert_eq!(d.expected_status, 200);
        assert!(d.expected_content_type.is_none());
        assert!(d.timeout.is_none());
        assert!(d.credentials.is_none());
        assert!(d.body.is_none());
        assert!(!d.echo);
    }

    #[test]
    fn setters_apply() {
        let d = RequestDescriptor::new(Method::Post, "http://h/artifactory/api/export/system")
            .expect_status(202)
            .expect_content_type("application/xml")
            .timeout(Duration::from_millis(500))
            .credentials(Credentials::new("admin", "password"))
            .echo(true);
        assert_eq!(d.expected_status, 202);
        assert_eq!(d.expected_content_type.as_deref(), Some("application/xml"));
        assert_eq!(d.timeout, Some(Duration::from_millis(500)));
        assert!(d.credentials.is_some());
        assert!(d.echo);
    }

    #[test]
    fn basic_header_encodes_username_and_password() {
        let creds = Credentials::new("admin", "password");
        // base64("admin:password")
        assert_eq!(creds.basic_header(), "Basic YWRtaW46cGFzc3dvcmQ=");
    }

    #[test]
    fn empty_username_credentials_are_distinct_from_absent() {
        let d = RequestDescriptor::new(Method::Get, "http://h/")
            .credentials(Credentials::new("", ""));
        assert!(d.credentials.is_some());
        assert_eq!(d.credentials.unwrap().username(), "");
    }

    #[test]
    fn credentials_debug_masks_password() {
        let debug = format!("{:?}", Credentials::new("admin", "hunter2"));
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn bytes_body_reports_its_length() {
        let body = RequestBody::from_bytes(b"<config/>".to_vec()).with_content_type("application/xml");
        assert_eq!(body.content_length(), 9);
        assert_eq!(body.content_type(), Some("application/xml"));
    }

    #[test]
    fn reader_body_reports_declared_length() {
        let body = RequestBody::from_reader(std::io::Cursor::new(vec![0u8; 16]), 16);
        assert_eq!(body.content_length(), 16);
        assert!(body.content_type().is_none());
    }
}
