//! Response body draining: buffer accumulation, optional console echo, and
//! read-timeout recovery.
//!
//! # Design
//! The body is read in fixed-size chunks through a tee so that an echoed
//! stream is byte-identical to the buffered result and appears live rather
//! than after the full download. A socket timeout that fires mid-stream is
//! swallowed on purpose: the server-side operation may still complete, so the
//! drain logs diagnostics (including a derived link to the server's log
//! viewer) and reports an absent body instead of an error. Partial bytes are
//! discarded — they cannot be trusted as complete.

use std::io::{self, Read, Write};

use tracing::warn;
use url::Url;

const CHUNK_SIZE: usize = 1024;

/// Outcome of draining a validated response.
///
/// `Absent` is distinct from `Bytes(vec![])`: it means either the response
/// carried no body entity at all, or a read timeout left the true outcome
/// unknown. Callers should treat it as "nothing to show", never as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Bytes(Vec<u8>),
    Absent,
}

impl ResponseBody {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            ResponseBody::Bytes(bytes) => Some(bytes),
            ResponseBody::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ResponseBody::Absent)
    }
}

/// Forwards every chunk to a primary buffer and, when present, a secondary
/// sink, without altering either stream.
struct TeeWriter<'a, 'b> {
    primary: &'a mut Vec<u8>,
    secondary: Option<&'b mut dyn Write>,
}

impl<'a, 'b> TeeWriter<'a, 'b> {
    fn new(primary: &'a mut Vec<u8>, secondary: Option<&'b mut dyn Write>) -> Self {
        Self { primary, secondary }
    }

    /// Terminates echoed output with a newline; the buffer is unaffected.
    fn finish_line(&mut self) -> io::Result<()> {
        if let Some(sink) = self.secondary.as_deref_mut() {
            sink.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl Write for TeeWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.extend_from_slice(buf);
        if let Some(sink) = self.secondary.as_deref_mut() {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(sink) = self.secondary.as_deref_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Drain `reader` fully, teeing to `echo` when present.
///
/// A socket timeout mid-read is recovered: diagnostics are logged and
/// `ResponseBody::Absent` is returned. Every other I/O failure propagates.
pub(crate) fn drain(
    reader: &mut dyn Read,
    request_url: &str,
    echo: Option<&mut dyn Write>,
) -> io::Result<ResponseBody> {
    let mut buffer = Vec::new();
    let mut tee = TeeWriter::new(&mut buffer, echo);
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => tee.write_all(&chunk[..n])?,
            Err(err) if is_read_timeout(&err) => {
                warn!("Communication with the server has timed out: {err}");
                warn!("ATTENTION: The command on the server may still be running!");
                warn!(
                    "Please check the server logs {} before re-running the command.",
                    system_logs_url(request_url)
                );
                return Ok(ResponseBody::Absent);
            }
            Err(err) => return Err(err),
        }
    }
    tee.finish_line()?;
    drop(tee);
    Ok(ResponseBody::Bytes(buffer))
}

/// A timeout surfaced while reading the body, as opposed to any other I/O
/// failure. ureq reports its own timeouts through the io error chain rather
/// than always using `TimedOut`, so both paths are checked.
fn is_read_timeout(err: &io::Error) -> bool {
    if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
        return true;
    }
    err.get_ref()
        .is_some_and(|inner| matches!(inner.downcast_ref::<ureq::Error>(), Some(ureq::Error::Timeout(_))))
}

/// Location of the server's log viewer, derived from the request URL by
/// replacing everything from the `/api` segment on. Falls back to the default
/// webapp path on the request host when no `/api` segment exists.
pub(crate) fn system_logs_url(request_url: &str) -> String {
    match request_url.find("/api") {
        Some(api_pos) => format!("{}/webapp/systemlogs.html", &request_url[..api_pos]),
        None => {
            let host = Url::parse(request_url)
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
                .unwrap_or_default();
            format!("http://{host}/artifactory/webapp/systemlogs.html")
        }
    }
}
