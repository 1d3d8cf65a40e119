//! Wire types for the extlogin capture endpoint.
//!
//! The external login page of a landscape posts the issued token to a
//! short-lived listener on the user's machine. This crate holds everything both
//! sides of that exchange agree on: the path and port, the request body, the
//! status body, and the CORS header values.

pub mod capture;
pub mod cors;

pub use capture::{
	CAPTURE_PATH, CapturePayload, CaptureResponse, CaptureStatus, DEFAULT_CAPTURE_PORT,
	DEFAULT_LOGIN_PATH, HTML_ERROR_MARKER, LOGIN_PORT_PARAM, TOKEN_FIELD, TOKEN_FIELD_LEGACY,
	looks_like_html,
};
