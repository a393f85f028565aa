//! Themes: named value bags with instance identity.
//!
//! A [`Theme`] carries the values (colors, spacings, whatever the consumer
//! defines) that theme-dependent rule sets read. Its [`ThemeId`] is what the
//! caching layer keys on: two themes share compiled sheets exactly when they
//! share an id. Clones share the id; deserialize or construct anew to get a
//! distinct one. This makes "same theme" an explicit, cheap identity check
//! instead of a deep comparison of every value.
//!
//! Themes load from JSON or TOML, either inline or from a file with the
//! format inferred from the extension.
//!
//! # Example
//!
//! ```rust
//! use lacquer::theme::Theme;
//!
//! let theme = Theme::from_json(
//!     r##"{ "name": "dark", "values": { "primary": "#7c3aed", "spacing": 8 } }"##,
//! )
//! .unwrap();
//!
//! assert_eq!(theme.name(), "dark");
//! assert_eq!(theme.get("spacing").and_then(|v| v.as_num()), Some(8.0));
//! ```

use crate::rules::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_THEME_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`Theme`] instance.
///
/// [`ThemeId::NONE`] is reserved for styling without a theme; fresh ids
/// start at 1 and never repeat within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThemeId(u64);

impl ThemeId {
    /// The identity used when styling without a theme.
    pub const NONE: Self = Self(0);

    /// Allocate a fresh id.
    pub fn fresh() -> Self {
        Self(NEXT_THEME_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// True for [`ThemeId::NONE`].
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("none")
        } else {
            write!(f, "theme-{}", self.0)
        }
    }
}

/// A named bag of theme values.
///
/// Equality of themes is identity, not structure: a clone styles
/// identically to the original, while a second theme built from the same
/// values gets its own sheets. See [`Theme::key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Human-readable name for this theme.
    #[serde(default)]
    name: String,

    /// Theme values by slot name.
    #[serde(default)]
    values: BTreeMap<String, Value>,

    /// Instance identity. Never serialized; every deserialized theme is a
    /// distinct instance.
    #[serde(skip, default = "ThemeId::fresh")]
    id: ThemeId,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new("")
    }
}

impl Theme {
    /// Create an empty theme with a fresh identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
            id: ThemeId::fresh(),
        }
    }

    /// Set a value, builder style.
    #[must_use]
    pub fn set(mut self, slot: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(slot.into(), value.into());
        self
    }

    /// Look up a value by slot name.
    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.values.get(slot)
    }

    /// The theme's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cache identity of this theme instance.
    pub const fn key(&self) -> ThemeId {
        self.id
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the theme carries no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over values by slot name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Load a theme from JSON text.
    ///
    /// # Errors
    /// Returns `ThemeLoadError` if JSON parsing fails.
    pub fn from_json(json: &str) -> Result<Self, ThemeLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a theme from TOML text.
    ///
    /// # Errors
    /// Returns `ThemeLoadError` if TOML parsing fails.
    pub fn from_toml(toml: &str) -> Result<Self, ThemeLoadError> {
        Ok(toml::from_str(toml)?)
    }

    /// Load a theme from a file (format inferred by extension).
    ///
    /// # Errors
    /// Returns `ThemeLoadError` if reading or parsing fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ThemeLoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            Some(ext) => Err(ThemeLoadError::UnsupportedFormat(ext.into())),
            None => Err(ThemeLoadError::UnsupportedFormat("unknown".into())),
        }
    }

    /// Serialize this theme to JSON.
    ///
    /// # Errors
    /// Returns `ThemeSaveError` if serialization fails.
    pub fn to_json(&self) -> Result<String, ThemeSaveError> {
        serde_json::to_string_pretty(self).map_err(ThemeSaveError::Json)
    }

    /// Serialize this theme to TOML.
    ///
    /// # Errors
    /// Returns `ThemeSaveError` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ThemeSaveError> {
        toml::to_string_pretty(self).map_err(ThemeSaveError::Toml)
    }

    /// Save this theme to a file (format inferred by extension).
    ///
    /// # Errors
    /// Returns `ThemeSaveError` if serialization or writing fails.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ThemeSaveError> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("json") | None => self.to_json()?,
            Some("toml") => self.to_toml()?,
            Some(ext) => return Err(ThemeSaveError::UnsupportedFormat(ext.into())),
        };
        fs::write(path, content).map_err(ThemeSaveError::Io)
    }
}

/// Error loading a theme.
#[derive(Error, Debug)]
pub enum ThemeLoadError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Error saving a theme.
#[derive(Error, Debug)]
pub enum ThemeSaveError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
