//! Culture registry: the cultures this deployment manages translations for.
//!
//! Built once from configuration and passed explicitly to whatever needs it.
//! The invariant culture is always implied and never listed.

use super::culture::{Culture, CultureError};
use crate::resource::INVARIANT_CULTURE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CultureRegistry {
    /// Configured cultures in declaration order, without the invariant culture
    cultures: Vec<String>,
    default_culture: String,
}

impl CultureRegistry {
    /// Build a registry from configured culture codes.
    ///
    /// # Arguments
    /// * `codes` - Culture codes such as "en", "no", "en-US"; duplicates and
    ///   blank entries are skipped
    /// * `default_culture` - Culture used for manual registration; defaults
    ///   to the first configured culture
    ///
    /// # Returns
    /// * `Err` if a code is malformed, no culture is configured, or the
    ///   default culture is not one of the configured cultures
    pub fn new(codes: &[String], default_culture: Option<&str>) -> Result<Self, CultureError> {
        let mut cultures: Vec<String> = Vec::new();
        for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            let code = Culture::validate_code(code)?;
            if !cultures.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
                cultures.push(code);
            }
        }

        let first = cultures.first().cloned().ok_or(CultureError::NoneConfigured)?;
        let default_culture = match default_culture.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => cultures
                .iter()
                .find(|c| c.eq_ignore_ascii_case(code))
                .cloned()
                .ok_or_else(|| CultureError::NotEnabled(code.to_string()))?,
            None => first,
        };

        Ok(Self {
            cultures,
            default_culture,
        })
    }

    /// Resolve a code to a configured culture. The invariant culture (`""`)
    /// always resolves.
    pub fn get(&self, code: &str) -> Result<Culture, CultureError> {
        if code == INVARIANT_CULTURE {
            return Ok(Culture::invariant());
        }

        self.cultures
            .iter()
            .find(|c| c.eq_ignore_ascii_case(code))
            .map(|c| Culture::from_registered(c))
            .ok_or_else(|| {
                if Culture::validate_code(code).is_ok() {
                    CultureError::NotEnabled(code.to_string())
                } else {
                    CultureError::InvalidCode(code.to_string())
                }
            })
    }

    pub fn is_enabled(&self, code: &str) -> bool {
        self.get(code).is_ok()
    }

    /// Configured cultures, optionally preceded by the invariant culture.
    pub fn list(&self, include_invariant: bool) -> Vec<String> {
        let mut cultures = Vec::with_capacity(self.cultures.len() + 1);
        if include_invariant {
            cultures.push(INVARIANT_CULTURE.to_string());
        }
        cultures.extend(self.cultures.iter().cloned());
        cultures
    }

    pub fn default_culture(&self) -> &str {
        &self.default_culture
    }
}
