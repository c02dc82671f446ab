use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::domain::Card;

/// Mutations of the client-side card cache.
///
/// Serialised as `{"type": TAG, "payload": ...}`; `RESET_CARD_STATE` carries
/// no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardAction {
    SetCards(Vec<Card>),
    SetCard(Card),
    EditCard(bool),
    Loading(bool),
    SetLimit(u32),
    SetCategory(Option<Value>),
    SetCount(u64),
    ResetCardState,
}

impl CardAction {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SetCards(_) => "SET_CARDS",
            Self::SetCard(_) => "SET_CARD",
            Self::EditCard(_) => "EDIT_CARD",
            Self::Loading(_) => "LOADING",
            Self::SetLimit(_) => "SET_LIMIT",
            Self::SetCategory(_) => "SET_CATEGORY",
            Self::SetCount(_) => "SET_COUNT",
            Self::ResetCardState => "RESET_CARD_STATE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorAction {
    SetError(String),
    ClearError,
}

/// Everything the [`crate::Store`] accepts through `dispatch`.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Card(CardAction),
    Error(ErrorAction),
}

impl From<CardAction> for AppAction {
    fn from(value: CardAction) -> Self {
        Self::Card(value)
    }
}

impl From<ErrorAction> for AppAction {
    fn from(value: ErrorAction) -> Self {
        Self::Error(value)
    }
}
