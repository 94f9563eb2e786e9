use std::fmt;

use crate::error::BackdropError;

/// Prefix applied to every background key unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "bg_";

/// Canonical background identity. Two requests name the same background
/// iff their keys compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackgroundKey(String);

impl BackgroundKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackgroundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BackgroundKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turns raw dialogue-engine arguments into [`BackgroundKey`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNormalizer {
    prefix: String,
}

impl Default for KeyNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl KeyNormalizer {
    /// An empty prefix disables namespacing. The prefix itself is lowercased.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim().to_lowercase(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Trim, strip one pair of matching quotes, lowercase, namespace.
    pub fn normalize(&self, raw: &str) -> Result<BackgroundKey, BackdropError> {
        let lowered = strip_quotes(raw.trim()).trim().to_lowercase();
        if lowered.is_empty() {
            return Err(BackdropError::EmptyKey);
        }
        if self.prefix.is_empty() || lowered.starts_with(&self.prefix) {
            Ok(BackgroundKey(lowered))
        } else {
            Ok(BackgroundKey(format!("{}{lowered}", self.prefix)))
        }
    }

    /// Key with the namespace prefix removed, used to build file names.
    pub fn bare<'a>(&self, key: &'a BackgroundKey) -> &'a str {
        key.as_str()
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(key.as_str())
    }
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
