use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CardId);

#[derive(Debug, Error)]
#[error("public id must not be empty")]
pub struct EmptyPublicId;

/// Identifier handed out by the media service for an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicId(String);

impl PublicId {
    /// Returns `None` for blank input; a public id is never empty.
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PublicId {
    type Error = EmptyPublicId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value).ok_or(EmptyPublicId)
    }
}

impl From<PublicId> for String {
    fn from(value: PublicId) -> Self {
        value.0
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of a photo field on a card: either no photo or a media public id.
///
/// The prop is kept as received and sent back verbatim; trimming only decides
/// whether it counts as empty. On the wire the empty marker is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PhotoRef {
    raw: String,
    public_id: Option<PublicId>,
}

impl PhotoRef {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_prop(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            public_id: PublicId::parse(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.public_id.is_none()
    }

    pub fn public_id(&self) -> Option<&PublicId> {
        self.public_id.as_ref()
    }

    /// The prop exactly as received.
    pub fn as_wire(&self) -> &str {
        &self.raw
    }
}

impl From<PublicId> for PhotoRef {
    fn from(value: PublicId) -> Self {
        Self {
            raw: value.as_str().to_string(),
            public_id: Some(value),
        }
    }
}

impl Serialize for PhotoRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for PhotoRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|raw| Self::from_prop(&raw)).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub photos: BTreeMap<String, PhotoRef>,
}

impl Card {
    pub fn new(id: CardId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
            photos: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_photo(mut self, name: impl Into<String>, photo: PhotoRef) -> Self {
        self.photos.insert(name.into(), photo);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Missing photo fields read as empty.
    pub fn photo(&self, name: &str) -> PhotoRef {
        self.photos.get(name).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoOperation {
    Add,
    Change,
    Delete,
}

impl PhotoOperation {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_photo_prop_is_empty() {
        assert!(PhotoRef::from_prop("").is_empty());
        assert!(PhotoRef::from_prop("   ").is_empty());
        assert_eq!(
            PhotoRef::from_prop("abc123").public_id().map(PublicId::as_str),
            Some("abc123")
        );
    }

    #[test]
    fn photo_ref_uses_empty_string_on_the_wire() {
        let card = Card::new(CardId(5))
            .with_field("title", "Ada")
            .with_photo("avatar", PhotoRef::empty())
            .with_photo("banner", PhotoRef::from_prop("b1"));

        let json = serde_json::to_value(&card).expect("serialize");
        assert_eq!(json["id"], 5);
        assert_eq!(json["photos"]["avatar"], "");
        assert_eq!(json["photos"]["banner"], "b1");

        let decoded: Card = serde_json::from_value(json).expect("deserialize");
        assert_eq!(decoded, card);
    }

    #[test]
    fn photo_prop_keeps_surrounding_whitespace() {
        let photo = PhotoRef::from_prop(" old1 ");
        assert!(!photo.is_empty());
        assert_eq!(photo.as_wire(), " old1 ");
        assert_eq!(photo.public_id().map(PublicId::as_str), Some("old1"));
        assert_eq!(
            serde_json::to_value(&photo).expect("serialize"),
            serde_json::json!(" old1 ")
        );
    }

    #[test]
    fn empty_public_id_is_rejected_on_decode() {
        assert!(serde_json::from_str::<PublicId>(r#""""#).is_err());
        assert!(serde_json::from_str::<PublicId>(r#""   ""#).is_err());
        let decoded: PublicId = serde_json::from_str(r#""abc123""#).expect("decode");
        assert_eq!(decoded.as_str(), "abc123");
        assert_eq!(
            serde_json::to_string(&decoded).expect("encode"),
            r#""abc123""#
        );
    }

    #[test]
    fn null_photo_decodes_as_empty() {
        let card: Card =
            serde_json::from_str(r#"{"id":1,"photos":{"avatar":null}}"#).expect("decode");
        assert!(card.photo("avatar").is_empty());
        assert!(card.photo("missing").is_empty());
        assert!(card.fields.is_empty());
    }
}
