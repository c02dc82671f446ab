use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{domain::Card, error::ErrorEvent};

use crate::action::{CardAction, ErrorAction};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCollectionState {
    pub cards: Vec<Card>,
    pub card: Option<Card>,
    pub edit: bool,
    pub loading: bool,
    pub limit: u32,
    pub category: Option<Value>,
    pub count: u64,
}

impl Default for CardCollectionState {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            card: None,
            edit: false,
            loading: false,
            limit: DEFAULT_PAGE_LIMIT,
            category: None,
            count: 0,
        }
    }
}

impl CardCollectionState {
    // No wildcard arm: adding a variant to `CardAction` must fail to compile here.
    pub fn reduce(&mut self, action: CardAction) {
        match action {
            CardAction::SetCards(cards) => self.cards = cards,
            CardAction::SetCard(card) => self.card = Some(card),
            CardAction::EditCard(edit) => self.edit = edit,
            CardAction::Loading(loading) => self.loading = loading,
            CardAction::SetLimit(limit) => self.limit = limit,
            CardAction::SetCategory(category) => self.category = category,
            CardAction::SetCount(count) => self.count = count,
            CardAction::ResetCardState => *self = Self::default(),
        }
    }

    pub fn find(&self, id: shared::domain::CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    pub current: Option<ErrorEvent>,
}

impl ErrorState {
    pub fn reduce(&mut self, action: ErrorAction) {
        match action {
            ErrorAction::SetError(message) => self.current = Some(ErrorEvent::new(message)),
            ErrorAction::ClearError => self.current = None,
        }
    }
}
