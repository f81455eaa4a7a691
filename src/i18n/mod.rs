//! Culture handling.
//!
//! - `registry`: the configured set of cultures, built from `Config`
//! - `culture`: validated culture identifier and its errors
//!
//! # Example
//!
//! ```rust,ignore
//! use localization_store::i18n::CultureRegistry;
//!
//! let registry = CultureRegistry::new(&config.supported_cultures, None)?;
//! let norwegian = registry.get("no")?;
//! let with_invariant = registry.list(true);
//! ```

mod culture;
mod registry;

pub use culture::{Culture, CultureError};
pub use registry::CultureRegistry;
