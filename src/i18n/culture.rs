//! Culture type: a validated culture identifier.

use crate::resource::INVARIANT_CULTURE;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CultureError {
    #[error("Invalid culture code: '{0}'")]
    InvalidCode(String),

    #[error("Culture '{0}' is not enabled")]
    NotEnabled(String),

    #[error("No cultures configured")]
    NoneConfigured,
}

// Language subtag plus optional region/script/variant subtags (en, en-US, sr-Latn-RS)
static CULTURE_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

fn culture_code_regex() -> &'static Regex {
    CULTURE_CODE_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("culture code regex is valid")
    })
}

/// A culture known to the registry. Constructed through
/// [`CultureRegistry::get`](super::CultureRegistry::get) or [`Culture::invariant`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Culture {
    code: String,
}

impl Culture {
    pub fn invariant() -> Self {
        Self {
            code: INVARIANT_CULTURE.to_string(),
        }
    }

    pub(super) fn from_registered(code: &str) -> Self {
        Self {
            code: code.to_string(),
        }
    }

    /// Check the shape of a culture code, returning it trimmed.
    pub fn validate_code(code: &str) -> Result<String, CultureError> {
        let trimmed = code.trim();
        if culture_code_regex().is_match(trimmed) {
            Ok(trimmed.to_string())
        } else {
            Err(CultureError::InvalidCode(code.to_string()))
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_invariant(&self) -> bool {
        self.code == INVARIANT_CULTURE
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invariant() {
            write!(f, "(invariant)")
        } else {
            write!(f, "{}", self.code)
        }
    }
}
