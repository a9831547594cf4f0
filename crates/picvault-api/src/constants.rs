//! API constants

/// Versioned API path prefix.
pub const API_PREFIX: &str = "/api/v0";

/// Liveness probe path (unversioned).
pub const HEALTH_PATH: &str = "/health";

/// In-flight request cap across all routes.
pub const MAX_CONCURRENT_REQUESTS: usize = 256;
