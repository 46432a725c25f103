//! Application-wide constants

/// Storage key under which the bearer token is persisted.
pub const TOKEN_STORAGE_KEY: &str = "token";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost/api/";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_DIR: &str = ".certwatch";
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const LOGIN_ROUTE: &str = "/login";
pub const SIGNUP_ROUTE: &str = "/signup";
pub const DEFAULT_ROUTE: &str = "/";
pub const ADMIN_ROUTE: &str = "/admin";
