use thiserror::Error;

/// Typed error hierarchy for the pipeline core.
///
/// Serializes as a plain string (the dashboard's `error.message`
/// convention) while giving Rust code typed variants that can be
/// matched or propagated with `?`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested status change is not an edge in the legal transition
    /// table. Resolved locally, never sent to the network.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Required field missing or malformed before submit. Caught before
    /// any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transport-level failure (connection refused, timeout, bad body).
    #[error("network error: {0}")]
    Network(String),

    /// The API answered but reported `success: false`.
    #[error("api error: {0}")]
    Api(String),

    /// Local preference store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Unknown IANA zone name.
    #[error("unknown timezone: {0}")]
    Zone(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Json(String),

    #[error("{0}")]
    Other(String),
}

/// Serialize as a plain string so callers that ship errors across the
/// wire envelope receive the same string shape the API uses.
impl serde::Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

/// Convenience alias for results in the core.
pub type Result<T> = std::result::Result<T, AppError>;

// ── From impls ─────────────────────────────────────────────────────────────

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        AppError::Other(e.to_string())
    }
}

/// Allows `.map_err(|e| format!("…", e))?` and `ok_or_else(|| format!(…))?`
/// to coerce into AppError without changing the call sites.
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}

/// Allows `.ok_or("literal string")?` to coerce into AppError.
impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Other(s.to_string())
    }
}
