//! StableId: Client-generated identity for a slide or deck.
//!
//! Assigned once when content first appears and carried through every edit,
//! independent of the server's numeric id and of the slide's position.

use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// A globally unique, client-generated identifier.
///
/// Serializes as a plain string so it round-trips through the sidecar and the
/// server payload unchanged. Ids received from the server are kept verbatim,
/// even if they are not UUIDs.
///
/// # Examples
/// ```
/// use deck_core::StableId;
///
/// let a = StableId::generate();
/// let b = StableId::generate();
/// assert_ne!(a, b);
/// assert_eq!(a.short(), &a.as_str()[..5]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    /// Generate a fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no identity has been assigned yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First five characters, as used in the deck's public URLs.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(5) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl Display for StableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StableId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for StableId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_uuid_shaped() {
        let id = StableId::generate();
        assert_eq!(id.as_str().len(), 36);
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_short_handles_short_ids() {
        assert_eq!(StableId::from("abc").short(), "abc");
        assert_eq!(StableId::from("abcdefgh").short(), "abcde");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = StableId::from("slide-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"slide-1\"");
        let parsed: StableId = serde_json::from_str("\"slide-1\"").unwrap();
        assert_eq!(parsed, id);
    }
}
