//! Dotted type paths like `Chorale.DefaultPhonemizer`, used to identify phonemizer
//! implementations in saved projects.

use core::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
};

/// Identifier for a kind of pluggable strategy, e.g. `Chorale.DefaultPhonemizer`.
///
/// One or more segments separated by periods. Each segment is an identifier: ASCII letters,
/// digits and underscores, not starting with a digit.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeKey(arcstr::ArcStr);

impl TypeKey {
    pub fn verify(str: &str) -> Result<(), TypeKeyParseError<'_>> {
        let error = |kind| Err(TypeKeyParseError { str, kind });
        if str.is_empty() {
            return error(TypeKeyParseErrorKind::Empty);
        }

        let mut offset = 0;
        for (index, segment) in str.split('.').enumerate() {
            let Some(first) = segment.chars().next() else {
                return error(TypeKeyParseErrorKind::EmptySegment { index });
            };
            if first.is_ascii_digit() {
                return error(TypeKeyParseErrorKind::LeadingDigit { pos: offset });
            }
            if let Some((pos, ch)) = segment
                .char_indices()
                .find(|&(_, ch)| !(ch.is_ascii_alphanumeric() || ch == '_'))
            {
                return error(TypeKeyParseErrorKind::InvalidChar {
                    pos: offset + pos,
                    ch,
                });
            }
            offset += segment.len() + 1;
        }
        Ok(())
    }

    pub fn new(str: &str) -> Result<Self, TypeKeyParseError<'_>> {
        Self::verify(str)?;
        Ok(Self(arcstr::ArcStr::from(str)))
    }

    /// Only for keys known at compile time. Panics on an invalid key.
    pub fn from_static(str: &'static str) -> Self {
        match Self::new(str) {
            Ok(key) => key,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last segment. Empty for single-segment keys.
    pub fn namespace(&self) -> &str {
        self.as_str().rsplit_once('.').map_or("", |(namespace, _)| namespace)
    }
    /// The last segment.
    pub fn name(&self) -> &str {
        self.as_str().rsplit_once('.').map_or(self.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

// hashes like a plain str so registries can be indexed by the raw strings stored in projects
impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}
impl Borrow<str> for TypeKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for TypeKey {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TypeKeyParseError<'a> {
    pub str: &'a str,
    pub kind: TypeKeyParseErrorKind,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TypeKeyParseErrorKind {
    Empty,
    /// `index` counts segments, not bytes.
    EmptySegment { index: usize },
    LeadingDigit { pos: usize },
    InvalidChar { pos: usize, ch: char },
}

impl fmt::Display for TypeKeyParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} isn't a valid type key: ", self.str)?;
        match self.kind {
            TypeKeyParseErrorKind::Empty => f.write_str("empty string"),
            TypeKeyParseErrorKind::EmptySegment { index } => {
                write!(f, "segment {index} is empty")
            }
            TypeKeyParseErrorKind::LeadingDigit { pos } => {
                write!(f, "segment at {pos} starts with a digit")
            }
            TypeKeyParseErrorKind::InvalidChar { pos, ch } => {
                write!(f, "invalid character {ch:?} at {pos}")
            }
        }
    }
}
impl std::error::Error for TypeKeyParseError<'_> {}

impl serde::Serialize for TypeKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
impl<'de> serde::Deserialize<'de> for TypeKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let str = <std::borrow::Cow<'_, str>>::deserialize(deserializer)?;
        Self::new(&str).map_err(|err| serde::de::Error::custom(err.to_string()))
    }
}
