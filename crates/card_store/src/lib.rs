//! Client-side card cache: the action vocabulary, its reducers, and the store
//! that holds the reduced state and broadcasts cache invalidations.

use shared::protocol::CacheTag;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

pub mod action;
pub mod state;

pub use action::{AppAction, CardAction, ErrorAction};
pub use state::{CardCollectionState, ErrorState, DEFAULT_PAGE_LIMIT};

const ACTION_CHANNEL_CAPACITY: usize = 256;
const INVALIDATION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub cards: CardCollectionState,
    pub error: ErrorState,
}

impl StoreState {
    pub fn reduce(&mut self, action: AppAction) {
        match action {
            AppAction::Card(action) => self.cards.reduce(action),
            AppAction::Error(action) => self.error.reduce(action),
        }
    }
}

pub struct Store {
    state: watch::Sender<StoreState>,
    actions: broadcast::Sender<AppAction>,
    invalidations: broadcast::Sender<CacheTag>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreState::default())
    }
}

impl Store {
    pub fn new(initial: StoreState) -> Self {
        let (state, _) = watch::channel(initial);
        let (actions, _) = broadcast::channel(ACTION_CHANNEL_CAPACITY);
        let (invalidations, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        Self {
            state,
            actions,
            invalidations,
        }
    }

    pub fn dispatch(&self, action: impl Into<AppAction>) {
        let action = action.into();
        debug!("store: dispatch action={action:?}");
        if let AppAction::Error(ErrorAction::SetError(message)) = &action {
            warn!("store: error reported message={message}");
        }
        let _ = self.actions.send(action.clone());
        self.state.send_modify(|state| state.reduce(action));
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn cards(&self) -> CardCollectionState {
        self.state.borrow().cards.clone()
    }

    pub fn error(&self) -> ErrorState {
        self.state.borrow().error.clone()
    }

    /// Receiver that observes every reduced state.
    pub fn watch(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    /// Every dispatched action, in dispatch order.
    pub fn subscribe(&self) -> broadcast::Receiver<AppAction> {
        self.actions.subscribe()
    }

    pub fn invalidate(&self, tag: CacheTag) {
        debug!("store: invalidate tag={tag}");
        let _ = self.invalidations.send(tag);
    }

    pub fn subscribe_invalidations(&self) -> BroadcastStream<CacheTag> {
        BroadcastStream::new(self.invalidations.subscribe())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
