//! Centralized default constants for the meetlog service.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page number for the listing endpoint.
pub const PAGE: i64 = 1;

/// Default page size for the listing endpoint.
pub const PAGE_LIMIT: i64 = 10;

/// Upper bound applied to client-supplied page sizes.
pub const PAGE_LIMIT_MAX: i64 = 100;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 5000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds (15 minutes).
pub const RATE_LIMIT_PERIOD_SECS: u64 = 900;

/// Maximum accepted request body, in bytes (10 MB).
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Default CORS origin allowed when `ALLOWED_ORIGINS` is not set.
pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

// =============================================================================
// DATABASE
// =============================================================================

/// Default connection string when `DATABASE_URL` is not set.
pub const DATABASE_URL: &str = "postgres://localhost/meetlog";
