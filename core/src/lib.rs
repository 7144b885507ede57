//! Synchronous REST client core for admin commands against an
//! Artifactory-style management API.
//!
//! # Overview
//! Calling commands (compress, export, import, configuration, security) are
//! thin collaborators: they build an absolute URL from host/port plus one of
//! the path constants in [`request`] and hand a [`RequestDescriptor`] to
//! [`execute`]. The core dispatches the request exactly once over blocking
//! HTTP, validates the returned status and content type, and drains the body
//! — optionally mirroring it to stdout as it streams.
//!
//! # Design
//! - One canonical operation, [`execute`], replaces the original overload
//!   explosion; [`get`], [`post`], [`put`], [`delete`] and [`get_string`] are
//!   thin wrappers with the documented defaults.
//! - No state is shared between calls: each call configures its own agent and
//!   connection, released on every exit path.
//! - Failures map onto the small taxonomy in [`RestError`]; the one
//!   recoverable case (socket timeout while streaming the body) is handled
//!   inside the response analyzer and reported as [`ResponseBody::Absent`].

pub mod client;
pub mod error;
pub mod request;
pub mod response;

pub use client::{delete, execute, get, get_string, post, put, CONNECT_TIMEOUT, DEFAULT_SOCKET_TIMEOUT};
pub use error::RestError;
pub use request::{Credentials, Method, RequestBody, RequestDescriptor};
pub use response::ResponseBody;
