//! Localization resource model.
//!
//! A resource is a translatable string identified by a unique key, holding at
//! most one translation per culture. The invariant culture (`""`) carries the
//! default text declared in code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Culture identifier of the invariant (default/fallback) translation.
pub const INVARIANT_CULTURE: &str = "";

/// Author recorded for resources created by a discovery sync.
pub const AUTHOR_TYPE_SCANNER: &str = "type-scanner";

/// Author recorded for resources registered programmatically.
pub const AUTHOR_MANUAL: &str = "manual";

/// Author recorded for resources created by a CSV import.
pub const AUTHOR_IMPORT: &str = "import";

/// A single translated value for one culture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub culture: String,
    pub value: String,
}

impl Translation {
    pub fn new(culture: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            culture: culture.into(),
            value: value.into(),
        }
    }

    pub fn is_invariant(&self) -> bool {
        self.culture == INVARIANT_CULTURE
    }
}

/// A persisted (or about to be persisted) localization resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationResource {
    /// Store id, `None` until the resource has been persisted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
    pub resource_key: String,
    pub translations: Vec<Translation>,
    /// `None`/`Some(false)`: untouched since the last code sync
    pub is_modified: Option<bool>,
    pub from_code: bool,
    pub is_hidden: bool,
    pub author: String,
    pub modification_date: DateTime<Utc>,
}

impl LocalizationResource {
    pub fn new(resource_key: impl Into<String>) -> Self {
        Self {
            id: None,
            resource_key: resource_key.into(),
            translations: Vec::new(),
            is_modified: Some(false),
            from_code: false,
            is_hidden: false,
            author: AUTHOR_TYPE_SCANNER.to_string(),
            modification_date: Utc::now(),
        }
    }

    /// Builder-style translation setter, used mostly when assembling fixtures.
    pub fn with_translation(mut self, culture: &str, value: &str) -> Self {
        self.set_translation(culture, value);
        self
    }

    pub fn with_modified(mut self, is_modified: Option<bool>) -> Self {
        self.is_modified = is_modified;
        self
    }

    /// Whether a human has edited this resource since the last code sync.
    pub fn is_modified(&self) -> bool {
        self.is_modified.unwrap_or(false)
    }

    pub fn translation(&self, culture: &str) -> Option<&Translation> {
        self.translations.iter().find(|t| t.culture == culture)
    }

    pub fn invariant(&self) -> Option<&Translation> {
        self.translation(INVARIANT_CULTURE)
    }

    /// Translation value for `culture`, optionally falling back to the
    /// invariant translation when the culture has none.
    pub fn value_for(&self, culture: &str, fallback_to_invariant: bool) -> Option<&str> {
        self.translation(culture)
            .or_else(|| {
                if fallback_to_invariant {
                    self.invariant()
                } else {
                    None
                }
            })
            .map(|t| t.value.as_str())
    }

    /// Set the value for `culture`, overwriting an existing translation so the
    /// one-translation-per-culture invariant holds.
    ///
    /// Returns `true` when the stored value changed.
    pub fn set_translation(&mut self, culture: &str, value: &str) -> bool {
        match self.translations.iter_mut().find(|t| t.culture == culture) {
            Some(existing) if existing.value == value => false,
            Some(existing) => {
                existing.value = value.to_string();
                true
            }
            None => {
                self.translations.push(Translation::new(culture, value));
                true
            }
        }
    }

    /// Returns `true` if a translation was removed.
    pub fn remove_translation(&mut self, culture: &str) -> bool {
        let before = self.translations.len();
        self.translations.retain(|t| t.culture != culture);
        self.translations.len() != before
    }
}

/// A translation found by a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredTranslation {
    pub culture: String,
    pub translation: String,
}

impl DiscoveredTranslation {
    pub fn new(culture: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            culture: culture.into(),
            translation: translation.into(),
        }
    }
}

/// A resource declared by the host application, as reported by a discoverer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredResource {
    pub key: String,
    /// Previous key when the declaration was renamed in code
    pub old_key: Option<String>,
    pub translations: Vec<DiscoveredTranslation>,
    pub is_hidden: bool,
}

impl DiscoveredResource {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            old_key: None,
            translations: Vec::new(),
            is_hidden: false,
        }
    }

    pub fn with_translation(mut self, culture: &str, translation: &str) -> Self {
        self.translations
            .push(DiscoveredTranslation::new(culture, translation));
        self
    }

    pub fn renamed_from(mut self, old_key: &str) -> Self {
        self.old_key = Some(old_key.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    /// The discovered invariant translation. When a declaration lists the
    /// invariant culture more than once the last entry wins.
    pub fn invariant(&self) -> Option<&DiscoveredTranslation> {
        self.translations
            .iter()
            .rev()
            .find(|t| t.culture == INVARIANT_CULTURE)
    }

    /// Renamed-from key, ignoring empty strings.
    pub fn rename_source(&self) -> Option<&str> {
        self.old_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Materialize as a brand-new stored resource.
    pub fn to_resource(&self) -> LocalizationResource {
        let mut resource = LocalizationResource::new(self.key.clone());
        resource.from_code = true;
        resource.is_hidden = self.is_hidden;
        for t in &self.translations {
            resource.set_translation(&t.culture, &t.translation);
        }
        resource
    }
}

/// A resource registered from code without a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualResource {
    pub key: String,
    pub translation: String,
}

impl ManualResource {
    pub fn new(key: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            translation: translation.into(),
        }
    }

    /// Discovered form carrying the text for both the default culture and the
    /// invariant culture.
    pub fn to_discovered(&self, default_culture: &str) -> DiscoveredResource {
        let mut discovered = DiscoveredResource::new(self.key.clone());
        if default_culture != INVARIANT_CULTURE {
            discovered = discovered.with_translation(default_culture, &self.translation);
        }
        discovered.with_translation(INVARIANT_CULTURE, &self.translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Translation Accessor Tests ====================

    #[test]
    fn test_set_translation_adds_missing_culture() {
        let mut resource = LocalizationResource::new("A.B");
        assert!(resource.set_translation("en", "Hello"));
        assert_eq!(resource.translation("en").unwrap().value, "Hello");
        assert_eq!(resource.translations.len(), 1);
    }

    #[test]
    fn test_set_translation_overwrites_existing_culture() {
        let mut resource = LocalizationResource::new("A.B").with_translation("en", "Hello");
        assert!(resource.set_translation("en", "Hi"));
        assert_eq!(resource.translations.len(), 1);
        assert_eq!(resource.translation("en").unwrap().value, "Hi");
    }

    #[test]
    fn test_set_translation_same_value_reports_unchanged() {
        let mut resource = LocalizationResource::new("A.B").with_translation("en", "Hello");
        assert!(!resource.set_translation("en", "Hello"));
    }

    #[test]
    fn test_remove_translation() {
        let mut resource = LocalizationResource::new("A.B")
            .with_translation("", "Default")
            .with_translation("en", "Hello");

        assert!(resource.remove_translation("en"));
        assert!(!resource.remove_translation("en"));
        assert_eq!(resource.translations.len(), 1);
        assert!(resource.invariant().is_some());
    }

    #[test]
    fn test_value_for_with_and_without_fallback() {
        let resource = LocalizationResource::new("A.B").with_translation("", "Default");

        assert_eq!(resource.value_for("no", true), Some("Default"));
        assert_eq!(resource.value_for("no", false), None);
        assert_eq!(resource.value_for("", false), Some("Default"));
    }

    #[test]
    fn test_is_modified_treats_none_as_unmodified() {
        let resource = LocalizationResource::new("A.B").with_modified(None);
        assert!(!resource.is_modified());
        assert!(resource.clone().with_modified(Some(true)).is_modified());
    }

    // ==================== Discovered Resource Tests ====================

    #[test]
    fn test_to_resource_copies_translations_and_flags() {
        let discovered = DiscoveredResource::new("A.B")
            .with_translation("", "Default")
            .with_translation("en", "English")
            .hidden();

        let resource = discovered.to_resource();
        assert_eq!(resource.resource_key, "A.B");
        assert_eq!(resource.is_modified, Some(false));
        assert!(resource.from_code);
        assert!(resource.is_hidden);
        assert_eq!(resource.translations.len(), 2);
    }

    #[test]
    fn test_rename_source_ignores_empty_old_key() {
        let discovered = DiscoveredResource::new("A.B").renamed_from("");
        assert!(discovered.rename_source().is_none());

        let discovered = DiscoveredResource::new("A.B").renamed_from("A.Old");
        assert_eq!(discovered.rename_source(), Some("A.Old"));
    }

    #[test]
    fn test_manual_resource_registers_default_and_invariant() {
        let manual = ManualResource::new("Manual.Key", "Text");
        let discovered = manual.to_discovered("en");

        assert_eq!(discovered.translations.len(), 2);
        assert_eq!(discovered.invariant().unwrap().translation, "Text");
        assert!(discovered.translations.iter().any(|t| t.culture == "en"));
    }
}
