//! SQL identifier validation.
//!
//! Column and table names are embedded in the identifier position of a
//! query, where bound parameters cannot be used. An [`Ident`] can only be
//! built from a string that passes validation:
//! - Must be non-empty and at most [`MAX_IDENT_LEN`] bytes
//! - Must start with an ASCII letter or `_`
//! - May contain only ASCII letters, digits, and `_`
//!
//! Nothing else (quotes, whitespace, punctuation, non-ASCII) gets through,
//! so rendering an `Ident` into SQL text cannot change the statement's shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Longest identifier PostgreSQL keeps without truncation.
pub const MAX_IDENT_LEN: usize = 63;

/// A validated SQL identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ident(String);

impl Ident {
    /// Validate `name` and wrap it.
    ///
    /// # Examples
    ///
    /// ```
    /// use rowfs_types::Ident;
    ///
    /// assert!(Ident::new("salary").is_ok());
    /// assert!(Ident::new("_private2").is_ok());
    /// assert!(Ident::new("").is_err());
    /// assert!(Ident::new("name; DROP TABLE data").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> TypeResult<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// The identifier as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL text. Validation guarantees no embedded
    /// quote characters, so no escaping is needed.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

fn validate(name: &str) -> TypeResult<()> {
    let invalid = |reason: &str| TypeError::InvalidIdent {
        name: name.to_string(),
        reason: reason.into(),
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid("must not be empty"));
    };
    if name.len() > MAX_IDENT_LEN {
        return Err(invalid(&format!("longer than {MAX_IDENT_LEN} bytes")));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid("must start with an ASCII letter or '_'"));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(invalid(&format!("contains forbidden character: {bad:?}")));
    }
    Ok(())
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({})", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ident {
    type Error = TypeError;

    fn try_from(value: String) -> TypeResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Ident {
    type Error = TypeError;

    fn try_from(value: &str) -> TypeResult<Self> {
        Self::new(value)
    }
}

impl From<Ident> for String {
    fn from(ident: Ident) -> Self {
        ident.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        assert!(Ident::new("data").is_ok());
        assert!(Ident::new("hoge").is_ok());
        assert!(Ident::new("Salary_2024").is_ok());
        assert!(Ident::new("_x").is_ok());
    }

    #[test]
    fn reject_empty() {
        assert!(Ident::new("").is_err());
    }

    #[test]
    fn reject_leading_digit() {
        assert!(Ident::new("1st").is_err());
    }

    #[test]
    fn reject_injection_attempts() {
        assert!(Ident::new("a b").is_err());
        assert!(Ident::new("x\"y").is_err());
        assert!(Ident::new("x; DROP TABLE data").is_err());
        assert!(Ident::new("x--").is_err());
        assert!(Ident::new("../etc").is_err());
    }

    #[test]
    fn reject_non_ascii() {
        assert!(Ident::new("füße").is_err());
    }

    #[test]
    fn reject_overlong() {
        let name = "a".repeat(MAX_IDENT_LEN + 1);
        assert!(Ident::new(name).is_err());
        assert!(Ident::new("a".repeat(MAX_IDENT_LEN)).is_ok());
    }

    #[test]
    fn quoted_form() {
        let ident = Ident::new("salary").unwrap();
        assert_eq!(ident.quoted(), "\"salary\"");
        assert_eq!(ident.to_string(), "salary");
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: Ident = serde_json::from_str("\"name\"").unwrap();
        assert_eq!(ok.as_str(), "name");
        assert!(serde_json::from_str::<Ident>("\"bad name\"").is_err());
    }
}
