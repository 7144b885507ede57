//! Transport executor: turns one request descriptor into response bytes or a
//! classified failure.
//!
//! # Design
//! Each call builds its own agent, so there is no shared mutable state and no
//! connection reuse between calls; the agent and response are dropped on every
//! exit path, which releases the underlying connection deterministically. Two
//! timeout domains apply: connection establishment is fixed at 3 s (fail
//! fast), while socket reads default to 60 s and honor the descriptor
//! override. Exactly one dispatch happens per descriptor — failures are
//! classified and surfaced, never retried.

use std::io::{self, Write};
use std::time::Duration;

use url::Url;

use crate::error::RestError;
use crate::request::{BodySource, Credentials, Method, RequestBody, RequestDescriptor};
use crate::response::{self, ResponseBody};

/// Connection-establishment timeout. Deliberately short and not
/// caller-configurable; the socket/read timeout is the knob callers get.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Socket/read timeout applied when the descriptor carries no override.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_millis(60_000);

/// The (host) scope a credential pair is bound to. Credentials are only ever
/// presented to the host parsed from the request URL, any port, any realm.
struct AuthScope {
    host: String,
}

impl AuthScope {
    fn for_host(host: &str) -> Self {
        Self {
            host: host.to_string(),
        }
    }

    fn covers(&self, host: &str) -> bool {
        self.host == host
    }
}

/// Execute a fully-specified request: dispatch once, validate status and
/// content type, drain the body.
///
/// Returns `ResponseBody::Absent` when the response carries no body entity or
/// when a socket timeout interrupts the body read (see `response::drain`).
pub fn execute(descriptor: RequestDescriptor) -> Result<ResponseBody, RestError> {
    let url = Url::parse(&descriptor.url).map_err(|err| RestError::UrlResolution {
        url: descriptor.url.clone(),
        reason: err.to_string(),
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| RestError::UrlResolution {
            url: descriptor.url.clone(),
            reason: "the URL has no host".to_string(),
        })?
        .to_string();

    let agent = build_agent(descriptor.timeout);

    // Preemptive auth: the header goes out with the first request, but only
    // to the host the scope was built for.
    let scope = AuthScope::for_host(&host);
    let auth_header = match &descriptor.credentials {
        Some(credentials) if scope.covers(&host) => Some(credentials.basic_header()),
        _ => None,
    };

    let RequestDescriptor {
        method,
        url: uri,
        body,
        expected_status,
        expected_content_type,
        echo,
        ..
    } = descriptor;

    let mut response =
        dispatch(&agent, method, &uri, body, auth_header.as_deref()).map_err(|err| classify(err, &uri))?;

    check_status(&uri, expected_status, response.status().as_u16())?;
    let content_type = response
        .headers()
        .get(ureq::http::header::CONTENT_TYPE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    check_content_type(&uri, expected_content_type.as_deref(), content_type.as_deref())?;

    // A zero-length entity means "nothing to show", not an empty buffer. A
    // missing Content-Length still gets drained: chunked and close-delimited
    // responses carry a body without declaring a length.
    if declared_content_length(response.headers()) == Some(0) {
        return Ok(ResponseBody::Absent);
    }

    let mut reader = response.body_mut().as_reader();
    let drained = if echo {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let result = response::drain(&mut reader, &uri, Some(&mut out));
        let _ = out.flush();
        result
    } else {
        response::drain(&mut reader, &uri, None)
    };
    drained.map_err(|err| RestError::Transport(Box::new(err)))
}

/// GET with default expectations (status 200, no content-type check).
pub fn get(uri: &str, credentials: Option<Credentials>) -> Result<ResponseBody, RestError> {
    execute(with_credentials(RequestDescriptor::new(Method::Get, uri), credentials))
}

/// GET returning the body as UTF-8 text, or `None` for an absent body.
pub fn get_string(uri: &str, credentials: Option<Credentials>) -> Result<Option<String>, RestError> {
    let body = get(uri, credentials)?;
    Ok(body
        .into_bytes()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// POST with default expectations; `body` may be absent (empty entity).
pub fn post(
    uri: &str,
    body: Option<RequestBody>,
    credentials: Option<Credentials>,
) -> Result<ResponseBody, RestError> {
    let mut descriptor = RequestDescriptor::new(Method::Post, uri);
    if let Some(body) = body {
        descriptor = descriptor.body(body);
    }
    execute(with_credentials(descriptor, credentials))
}

/// PUT with default expectations; `body` may be absent (empty entity).
pub fn put(
    uri: &str,
    body: Option<RequestBody>,
    credentials: Option<Credentials>,
) -> Result<ResponseBody, RestError> {
    let mut descriptor = RequestDescriptor::new(Method::Put, uri);
    if let Some(body) = body {
        descriptor = descriptor.body(body);
    }
    execute(with_credentials(descriptor, credentials))
}

/// DELETE with default expectations.
pub fn delete(uri: &str, credentials: Option<Credentials>) -> Result<ResponseBody, RestError> {
    execute(with_credentials(RequestDescriptor::new(Method::Delete, uri), credentials))
}

fn with_credentials(descriptor: RequestDescriptor, credentials: Option<Credentials>) -> RequestDescriptor {
    match credentials {
        Some(credentials) => descriptor.credentials(credentials),
        None => descriptor,
    }
}

fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    let socket_timeout = timeout.filter(|t| !t.is_zero()).unwrap_or(DEFAULT_SOCKET_TIMEOUT);
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_connect(Some(CONNECT_TIMEOUT))
        .timeout_recv_response(Some(socket_timeout))
        .timeout_recv_body(Some(socket_timeout))
        .build()
        .new_agent()
}

fn dispatch(
    agent: &ureq::Agent,
    method: Method,
    uri: &str,
    body: Option<RequestBody>,
    auth_header: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match method {
        Method::Get => {
            let mut request = agent.get(uri);
            if let Some(value) = auth_header {
                request = request.header("Authorization", value);
            }
            request.call()
        }
        Method::Delete => {
            let mut request = agent.delete(uri);
            if let Some(value) = auth_header {
                request = request.header("Authorization", value);
            }
            request.call()
        }
        Method::Put | Method::Post => {
            let mut request = if method == Method::Put {
                agent.put(uri)
            } else {
                agent.post(uri)
            };
            if let Some(value) = auth_header {
                request = request.header("Authorization", value);
            }
            match body {
                None => request.send_empty(),
                Some(body) => {
                    let (source, content_type) = body.into_parts();
                    if let Some(content_type) = content_type {
                        request = request.content_type(content_type);
                    }
                    match source {
                        BodySource::Bytes(bytes) => request.send(&bytes[..]),
                        BodySource::Reader { reader, len } => request
                            .header("Content-Length", len.to_string())
                            .send(ureq::SendBody::from_owned_reader(reader)),
                    }
                }
            }
        }
    }
}

/// Length the response declares via its Content-Length header, if any.
fn declared_content_length(headers: &ureq::http::HeaderMap) -> Option<u64> {
    headers
        .get(ureq::http::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn check_status(uri: &str, expected: u16, received: u16) -> Result<(), RestError> {
    if received != expected {
        return Err(RestError::StatusMismatch {
            url: uri.to_string(),
            expected,
            received,
        });
    }
    Ok(())
}

/// Content-type check: only applies when the response actually carries a
/// content-type header and a non-blank expectation was supplied. A missing
/// header is never an error.
fn check_content_type(
    uri: &str,
    expected: Option<&str>,
    actual: Option<&str>,
) -> Result<(), RestError> {
    let Some(actual) = actual else { return Ok(()) };
    let Some(expected) = expected.filter(|value| !value.trim().is_empty()) else {
        return Ok(());
    };
    if !actual.contains(expected) {
        return Err(RestError::ContentTypeMismatch {
            url: uri.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Map a dispatch failure into the error taxonomy. Anything without a more
/// specific kind lands in `Transport`.
fn classify(err: ureq::Error, uri: &str) -> RestError {
    match err {
        ureq::Error::BadUri(_) => RestError::UrlResolution {
            url: uri.to_string(),
            reason: err.to_string(),
        },
        ureq::Error::HostNotFound => RestError::UnknownHost {
            url: uri.to_string(),
        },
        ureq::Error::Tls(_) => RestError::TlsUnsupported,
        ureq::Error::Timeout(ureq::Timeout::Resolve | ureq::Timeout::Connect) => {
            RestError::ConnectTimeout(err.to_string())
        }
        ureq::Error::ConnectionFailed => RestError::ConnectionRefused {
            url: uri.to_string(),
        },
        ureq::Error::Io(ref io_err) if is_resolver_failure(io_err) => RestError::UnknownHost {
            url: uri.to_string(),
        },
        ureq::Error::Io(ref io_err) => match io_err.kind() {
            io::ErrorKind::ConnectionRefused => RestError::ConnectionRefused {
                url: uri.to_string(),
            },
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                RestError::NoRouteToHost {
                    url: uri.to_string(),
                }
            }
            io::ErrorKind::TimedOut => RestError::ConnectTimeout(err.to_string()),
            _ => RestError::Transport(Box::new(err)),
        },
        other => RestError::Transport(Box::new(other)),
    }
}

/// A failed DNS lookup. getaddrinfo errors reach us as an uncategorized io
/// error, so the message text is the only signal; glibc, BSD/macOS and
/// Windows all spell it differently.
fn is_resolver_failure(err: &io::Error) -> bool {
    let message = err.to_string();
    message.contains("failed to lookup address")
        || message.contains("Name or service not known")
        || message.contains("nodename nor servname")
        || message.contains("No such host is known")
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "http://host:8081/artifactory/api/system";

    #[test]
    fn auth_scope_covers_its_own_host_only() {
        let scope = AuthScope::for_host("host");
        assert!(scope.covers("host"));
        assert!(!scope.covers("other-host"));
        assert!(!scope.covers("host.example.com"));
    }

    #[test]
    fn status_check_passes_on_match() {
        assert!(check_status(URI, 200, 200).is_ok());
    }

    #[test]
    fn status_check_carries_both_codes() {
        let err = check_status(URI, 200, 404).unwrap_err();
        match err {
            RestError::StatusMismatch {
                expected, received, ..
            } => {
                assert_eq!(expected, 200);
                assert_eq!(received, 404);
            }
            other => panic!("expected StatusMismatch, got {other:?}"),
        }
    }

    #[test]
    fn content_type_check_skipped_without_header() {
        assert!(check_content_type(URI, Some("application/xml"), None).is_ok());
    }

    #[test]
    fn content_type_check_skipped_for_blank_expectation() {
        assert!(check_content_type(URI, Some("   "), Some("text/plain")).is_ok());
        assert!(check_content_type(URI, None, Some("text/plain")).is_ok());
    }

    #[test]
    fn content_type_substring_match_passes() {
        assert!(check_content_type(URI, Some("application/xml"), Some("application/xml; charset=utf-8")).is_ok());
    }

    #[test]
    fn content_type_mismatch_fails() {
        let err = check_content_type(URI, Some("application/xml"), Some("text/plain")).unwrap_err();
        assert!(matches!(err, RestError::ContentTypeMismatch { .. }));
    }

    #[test]
    fn zero_content_length_header_is_an_empty_entity() {
        let mut headers = ureq::http::HeaderMap::new();
        headers.insert(
            ureq::http::header::CONTENT_LENGTH,
            ureq::http::HeaderValue::from_static("0"),
        );
        assert_eq!(declared_content_length(&headers), Some(0));
    }

    #[test]
    fn missing_content_length_header_declares_nothing() {
        // chunked/close-delimited bodies must still be drained
        assert_eq!(declared_content_length(&ureq::http::HeaderMap::new()), None);
    }

    #[test]
    fn nonzero_content_length_is_reported() {
        let mut headers = ureq::http::HeaderMap::new();
        headers.insert(
            ureq::http::header::CONTENT_LENGTH,
            ureq::http::HeaderValue::from_static("17"),
        );
        assert_eq!(declared_content_length(&headers), Some(17));
    }

    #[test]
    fn classify_connection_refused() {
        let err = classify(
            ureq::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
            URI,
        );
        assert!(matches!(err, RestError::ConnectionRefused { .. }));
    }

    #[test]
    fn classify_no_route_to_host() {
        let err = classify(
            ureq::Error::Io(io::Error::new(io::ErrorKind::HostUnreachable, "no route")),
            URI,
        );
        assert!(matches!(err, RestError::NoRouteToHost { .. }));
    }

    #[test]
    fn classify_unknown_host() {
        let err = classify(ureq::Error::HostNotFound, URI);
        assert!(matches!(err, RestError::UnknownHost { .. }));
    }

    #[test]
    fn classify_resolver_failure_as_unknown_host() {
        // getaddrinfo failures surface with an uncategorized kind, not a
        // dedicated variant
        let lookup = io::Error::other(
            "failed to lookup address information: Name or service not known",
        );
        let err = classify(ureq::Error::Io(lookup), URI);
        match err {
            RestError::UnknownHost { url } => assert_eq!(url, URI),
            other => panic!("expected UnknownHost, got {other:?}"),
        }
    }

    #[test]
    fn classify_unmatched_io_as_transport() {
        let err = classify(
            ureq::Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe")),
            URI,
        );
        assert!(matches!(err, RestError::Transport(_)));
    }

    #[test]
    fn execute_rejects_unparseable_url() {
        let err = execute(RequestDescriptor::new(Method::Get, "not a url")).unwrap_err();
        match err {
            RestError::UrlResolution { url, .. } => assert_eq!(url, "not a url"),
            other => panic!("expected UrlResolution, got {other:?}"),
        }
    }
}
