//! CORS header values set on every capture endpoint response.

/// Origin value used for preflight responses and unusable landscape origins.
pub const ANY_ORIGIN: &str = "*";

pub const METHODS: &str = "GET, POST, OPTIONS, PUT, PATCH, DELETE";

/// Allowed request headers on regular responses.
pub const HEADERS: &str = "X-Requested-With, Content-Type";

/// Allowed request headers on preflight responses.
pub const PREFLIGHT_HEADERS: &str = "X-Requested-With, Content-Type, Authorization, Content-Length";

pub const CREDENTIALS: &str = "true";
