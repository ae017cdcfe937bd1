use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = hearth_common::id::prefixed_ulid("ses");
/// assert!(id.starts_with("ses_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string())
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const SESSION: &str = "ses";
}
