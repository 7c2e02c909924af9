//! Volatile session tokens.
//!
//! Some clients embed generated values (timestamped configuration session
//! names, nonces) in what they write and expect the device to echo them. A
//! recording would never match on replay, so matches are stored as a
//! placeholder and the live value is carried from the write to the next read
//! that contains the placeholder.

use regex::Regex;

/// Stored in place of a volatile token.
pub const TOKEN_PLACEHOLDER: &str = "__VOLATILE_TOKEN__";

/// Pattern identifying volatile tokens.
#[derive(Debug, Clone)]
pub struct TokenMask {
    pattern: Regex,
}

impl TokenMask {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Replace every token in `text` with the placeholder.
    pub fn mask(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, TOKEN_PLACEHOLDER)
            .into_owned()
    }

    /// First token found in `text`, if any.
    pub fn capture(&self, text: &str) -> Option<String> {
        self.pattern.find(text).map(|m| m.as_str().to_string())
    }
}

/// Mask `text` when a mask is configured.
pub(crate) fn mask_opt(mask: Option<&TokenMask>, text: &str) -> String {
    match mask {
        Some(mask) => mask.mask(text),
        None => text.to_string(),
    }
}
