//! Copy-on-write string type used throughout the wire model.
//!
//! Gateway payloads are parsed once per frame and then either discarded or
//! handed to the state cache for long-term storage, so the same string type
//! has to serve two different lifetimes: a borrow into the frame buffer
//! while routing, and an owned, `'static` value once something is cached.
//! `SandwichStr` picks between the two at the call site instead of forcing
//! an allocation on every field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

#[derive(Clone, Eq)]
pub enum SandwichStr<'a> {
    Borrowed(&'a str),
    Owned(String),
    Shared(Arc<str>),
}

impl SandwichStr<'_> {
    #[must_use]
    pub fn into_owned(self) -> String {
        match self {
            Self::Borrowed(s) => s.to_owned(),
            Self::Owned(s) => s,
            Self::Shared(s) => s.to_string(),
        }
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<str> {
        match self {
            Self::Borrowed(s) => Arc::from(s),
            Self::Owned(s) => Arc::from(s),
            Self::Shared(s) => s,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Deref for SandwichStr<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(s) => s,
            Self::Owned(s) => s,
            Self::Shared(s) => s,
        }
    }
}

impl fmt::Debug for SandwichStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl fmt::Display for SandwichStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl PartialEq for SandwichStr<'_> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl PartialEq<str> for SandwichStr<'_> {
    fn eq(&self, other: &str) -> bool {
        &**self == other
    }
}

impl PartialEq<&str> for SandwichStr<'_> {
    fn eq(&self, other: &&str) -> bool {
        &**self == *other
    }
}

impl PartialEq<String> for SandwichStr<'_> {
    fn eq(&self, other: &String) -> bool {
        &**self == other.as_str()
    }
}

impl<'a> PartialEq<SandwichStr<'a>> for String {
    fn eq(&self, other: &SandwichStr<'a>) -> bool {
        self.as_str() == &**other
    }
}

impl std::hash::Hash for SandwichStr<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}

impl Serialize for SandwichStr<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self)
    }
}

impl<'de> Deserialize<'de> for SandwichStr<'_> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Always lands as Owned: the deserializer's input buffer doesn't
        // outlive the frame, and cached entities need 'static data anyway.
        let s = String::deserialize(deserializer)?;
        Ok(SandwichStr::Owned(s))
    }
}

impl<'a> From<&'a str> for SandwichStr<'a> {
    fn from(s: &'a str) -> Self {
        Self::Borrowed(s)
    }
}

impl From<String> for SandwichStr<'_> {
    fn from(s: String) -> Self {
        Self::Owned(s)
    }
}

impl From<Arc<str>> for SandwichStr<'_> {
    fn from(s: Arc<str>) -> Self {
        Self::Shared(s)
    }
}

impl<'a> From<Cow<'a, str>> for SandwichStr<'a> {
    fn from(cow: Cow<'a, str>) -> Self {
        match cow {
            Cow::Borrowed(s) => Self::Borrowed(s),
            Cow::Owned(s) => Self::Owned(s),
        }
    }
}

impl<'a> From<&'a String> for SandwichStr<'a> {
    #[inline]
    fn from(s: &'a String) -> Self {
        Self::Borrowed(s.as_str())
    }
}

impl Default for SandwichStr<'_> {
    fn default() -> Self {
        Self::Borrowed("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_to_owned() {
        let s: SandwichStr = crate::json::from_str(r#""hello""#).unwrap();
        assert!(matches!(s, SandwichStr::Owned(_)));
        assert_eq!(s, "hello");
    }

    #[test]
    fn empty_rfc3339_placeholder_is_empty() {
        let s = SandwichStr::default();
        assert!(s.is_empty());
    }
}
