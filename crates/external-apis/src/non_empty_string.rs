// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Non-empty string validation for provider credentials and endpoints
//!
//! API keys commonly arrive through environment variables with a trailing
//! newline, so the value is trimmed on construction. `Debug` output never
//! reveals the full value, which keeps keys out of logs.
//!
//! ```rust
//! use external_apis::NonEmptyString;
//!
//! let key = NonEmptyString::new(" sk-1234567890\n").unwrap();
//! assert_eq!(key.as_str(), "sk-1234567890");
//! assert!(NonEmptyString::new("   ").is_err());
//! ```

use core::fmt;
use std::str::FromStr;

/// A trimmed string guaranteed to contain at least one character
#[derive(Clone, PartialEq, Eq)]
pub struct NonEmptyString(Box<str>);

impl NonEmptyString {
    /// Create a new `NonEmptyString`, trimming surrounding whitespace
    ///
    /// # Errors
    ///
    /// Returns an error message if the input is empty or whitespace-only
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Err("String cannot be empty or whitespace-only".to_string())
        } else {
            Ok(NonEmptyString(Box::from(trimmed)))
        }
    }

    /// Get a string slice of the contained value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value safe to print in logs: the first four characters followed by `***`
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}***")
    }
}

impl fmt::Debug for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NonEmptyString")
            .field(&self.redacted())
            .finish()
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NonEmptyString {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_input() {
        let value = NonEmptyString::new("  key-123\n").unwrap();
        assert_eq!(value.as_str(), "key-123");
        assert_eq!(value.to_string(), "key-123");
    }

    #[test]
    fn rejects_blank_input() {
        assert!(NonEmptyString::new("").is_err());
        assert!(NonEmptyString::new(" \t\n").is_err());
        assert!("".parse::<NonEmptyString>().is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let value = NonEmptyString::new("supersecretkey").unwrap();
        let debug = format!("{value:?}");
        assert!(debug.contains("supe***"));
        assert!(!debug.contains("supersecretkey"));
    }
}
