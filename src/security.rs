use subtle::ConstantTimeEq;

/// Header carrying the admin API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time comparison for secrets.
///
/// Both inputs are compared over their full length so timing does not leak
/// the position of the first differing byte.
pub fn constant_time_compare(expected: &str, presented: &str) -> bool {
    let length_matches = expected.len().ct_eq(&presented.len());
    let padded: Vec<u8> = presented
        .bytes()
        .chain(std::iter::repeat(0))
        .take(expected.len())
        .collect();
    (length_matches & expected.as_bytes().ct_eq(&padded)).into()
}

/// Whether a request may use mutating admin routes.
///
/// With no configured key the admin surface is open; otherwise the presented
/// key must match exactly.
pub fn is_authorized(configured: Option<&str>, presented: Option<&str>) -> bool {
    match (configured, presented) {
        (None, _) => true,
        (Some(expected), Some(presented)) => constant_time_compare(expected, presented),
        (Some(_), None) => false,
    }
}
