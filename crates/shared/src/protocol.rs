use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{CardId, PublicId};

/// Label broadcast after a mutation so dependent queries refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheTag {
    Card,
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card => f.write_str("Card"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditFieldRequest {
    pub id: CardId,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPhotoRequest {
    pub id: CardId,
    pub field: String,
    pub public_id: PublicId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePhotoRequest {
    pub id: CardId,
    pub field: String,
    /// The card's current photo prop, sent as received. Never empty: a card
    /// without a photo gets an add, not a change.
    pub old_public_id: String,
    pub new_public_id: PublicId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePhotoRequest {
    pub id: CardId,
    pub field: String,
    pub public_id: String,
}

/// Response body of an unsigned media upload. Only `public_id` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUploadResponse {
    pub public_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn photo_requests_use_camel_case_keys() {
        let add = AddPhotoRequest {
            id: CardId(5),
            field: "avatar".into(),
            public_id: PublicId::parse("abc123").expect("id"),
        };
        assert_eq!(
            serde_json::to_value(&add).expect("add"),
            json!({"id": 5, "field": "avatar", "publicId": "abc123"})
        );

        let change = ChangePhotoRequest {
            id: CardId(5),
            field: "avatar".into(),
            old_public_id: "old1".into(),
            new_public_id: PublicId::parse("new2").expect("id"),
        };
        assert_eq!(
            serde_json::to_value(&change).expect("change"),
            json!({"id": 5, "field": "avatar", "oldPublicId": "old1", "newPublicId": "new2"})
        );
    }

    #[test]
    fn edit_request_keeps_empty_value() {
        let edit = EditFieldRequest {
            id: CardId(9),
            field: "title".into(),
            value: String::new(),
        };
        assert_eq!(
            serde_json::to_value(&edit).expect("edit"),
            json!({"id": 9, "field": "title", "value": ""})
        );
    }
}
