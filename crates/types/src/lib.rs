//! Shared validated types for the Plantão workspace.
//!
//! Reference data entities are keyed by slug-style identifiers that double as
//! source filenames. [`DataId`] enforces the identifier grammar at
//! construction time so that every other crate can take a `&DataId` and stop
//! worrying about path traversal or malformed filenames.

/// Errors that can occur when creating validated identifier types.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The input was empty or contained only whitespace
    #[error("id cannot be empty")]
    Empty,
    /// The input did not match the slug grammar
    #[error("invalid id format: {0:?} (expected lowercase slug like \"amoxicilina-clavulanato\")")]
    Format(String),
}

/// A slug-style entity identifier.
///
/// Wraps a `String` that is guaranteed to match
/// `^[a-z0-9]+(-[a-z0-9]+)*$`: one or more lowercase-alphanumeric runs
/// separated by single hyphens. Identifiers are used verbatim as source
/// filename stems, so the grammar deliberately excludes anything with
/// filesystem meaning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataId(String);

impl DataId {
    /// Creates a new `DataId` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` for empty input and `IdError::Format` when
    /// the input does not match the slug grammar.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdError> {
        let raw = input.as_ref();
        if raw.is_empty() {
            return Err(IdError::Empty);
        }
        if !Self::is_valid(raw) {
            return Err(IdError::Format(raw.to_owned()));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Checks a candidate string against the slug grammar without allocating.
    pub fn is_valid(candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        let mut prev_was_hyphen = true; // no leading hyphen
        for byte in candidate.bytes() {
            match byte {
                b'a'..=b'z' | b'0'..=b'9' => prev_was_hyphen = false,
                b'-' if !prev_was_hyphen => prev_was_hyphen = true,
                _ => return false,
            }
        }
        !prev_was_hyphen // no trailing hyphen
    }

    /// Returns the inner identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DataId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DataId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for DataId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for DataId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DataId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DataId::new(&s).map_err(serde::de::Error::custom)
    }
}
