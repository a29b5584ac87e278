//! [Identifier]s are strings used to name entities in programming languages.

use std::{fmt::Display, ops::Deref};

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::{
    common_traits::Verify,
    context::Context,
    printable::{self, Printable},
    result, verify_err_noloc,
};

#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
/// An [Identifier] must satisfy the regex `[a-zA-Z_][a-zA-Z0-9_]*`.
/// Also see [module description](module@crate::identifier).
pub struct Identifier(String);

static IDENTIFIER_RE: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap());

impl Identifier {
    /// Is `s` a well formed identifier?
    pub fn is_valid(s: &str) -> bool {
        IDENTIFIER_RE.is_match(s)
    }
}

impl Printable for Identifier {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        <Self as Display>::fmt(self, f)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier(value.to_string())
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl Deref for Identifier {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Error)]
#[error("Malformed identifier {0}")]
pub struct MalformedIdentifierErr(String);

impl Verify for Identifier {
    fn verify(&self, _ctx: &Context) -> result::Result<()> {
        if !Identifier::is_valid(&self.0) {
            return verify_err_noloc!(MalformedIdentifierErr(self.0.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Identifier;

    #[test]
    fn valid_identifiers() {
        assert!(Identifier::is_valid("_foo"));
        assert!(Identifier::is_valid("foo_123"));
        assert!(!Identifier::is_valid("1foo"));
        assert!(!Identifier::is_valid("foo.bar"));
        assert!(!Identifier::is_valid(""));
    }
}
