//! Field-and-photo editor for a single card.
//!
//! Photo operations upload to the media service first and only then send
//! the new public id to the backend. Every operation on a card holds that
//! card's entry in [`CardLocks`] while it has a remote call in flight.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use shared::{
    domain::{CardId, PhotoOperation, PhotoRef, PublicId},
    protocol::{
        AddPhotoRequest, CacheTag, ChangePhotoRequest, DeletePhotoRequest, EditFieldRequest,
    },
};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::{
    media::{MediaUploader, SelectedFile},
    CardBackend, Dispatcher,
};

pub const DEFAULT_PREVIEW_HEIGHT: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorOperation {
    EditField,
    AddPhoto,
    ChangePhoto,
    DeletePhoto,
}

impl fmt::Display for EditorOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EditField => "edit field",
            Self::AddPhoto => "add photo",
            Self::ChangePhoto => "change photo",
            Self::DeletePhoto => "delete photo",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("field name must not be empty")]
    InvalidField,
    #[error("card {card_id} is busy with {operation}")]
    Busy {
        card_id: CardId,
        operation: EditorOperation,
    },
    #[error("card {card_id} has no photo to change")]
    NoPhoto { card_id: CardId },
    #[error("{0}")]
    Upload(String),
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationState {
    #[default]
    Idle,
    Uploading,
    Submitting,
}

/// Busy flags, one per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorStatus {
    pub edit_field: OperationState,
    pub add_photo: OperationState,
    pub change_photo: OperationState,
    pub delete_photo: OperationState,
}

impl EditorStatus {
    pub fn get(&self, operation: EditorOperation) -> OperationState {
        match operation {
            EditorOperation::EditField => self.edit_field,
            EditorOperation::AddPhoto => self.add_photo,
            EditorOperation::ChangePhoto => self.change_photo,
            EditorOperation::DeletePhoto => self.delete_photo,
        }
    }

    fn set(&mut self, operation: EditorOperation, state: OperationState) {
        let slot = match operation {
            EditorOperation::EditField => &mut self.edit_field,
            EditorOperation::AddPhoto => &mut self.add_photo,
            EditorOperation::ChangePhoto => &mut self.change_photo,
            EditorOperation::DeletePhoto => &mut self.delete_photo,
        };
        *slot = state;
    }

    pub fn is_busy(&self) -> bool {
        *self != Self::default()
    }
}

/// Form slots that hold a picked file and, after upload, its public id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormSlot {
    AddPhoto,
    ChangePhoto,
}

impl FormSlot {
    fn operation(self) -> EditorOperation {
        match self {
            Self::AddPhoto => EditorOperation::AddPhoto,
            Self::ChangePhoto => EditorOperation::ChangePhoto,
        }
    }

    fn photo_operation(self) -> PhotoOperation {
        match self {
            Self::AddPhoto => PhotoOperation::Add,
            Self::ChangePhoto => PhotoOperation::Change,
        }
    }
}

impl fmt::Display for FormSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddPhoto => f.write_str("addPhoto"),
            Self::ChangePhoto => f.write_str("changePhoto"),
        }
    }
}

#[derive(Debug, Clone)]
enum SlotValue {
    Selected(SelectedFile),
    Uploaded(PublicId),
}

impl SlotValue {
    fn is_selected(&self, file: &SelectedFile) -> bool {
        matches!(self, Self::Selected(current) if current == file)
    }

    fn is_uploaded(&self, public_id: &PublicId) -> bool {
        matches!(self, Self::Uploaded(current) if current == public_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoOutcome {
    NothingSelected,
    Committed(PublicId),
}

/// In-flight operations keyed by card, shared by every editor of a process.
#[derive(Debug, Clone, Default)]
pub struct CardLocks {
    held: Arc<StdMutex<HashMap<CardId, EditorOperation>>>,
}

impl CardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder(&self, card_id: CardId) -> Option<EditorOperation> {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&card_id)
            .copied()
    }

    fn try_acquire(
        &self,
        card_id: CardId,
        operation: EditorOperation,
    ) -> Result<CardLockGuard, EditorError> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = held.get(&card_id) {
            return Err(EditorError::Busy {
                card_id,
                operation: *current,
            });
        }
        held.insert(card_id, operation);
        Ok(CardLockGuard {
            held: Arc::clone(&self.held),
            card_id,
        })
    }
}

struct CardLockGuard {
    held: Arc<StdMutex<HashMap<CardId, EditorOperation>>>,
    card_id: CardId,
}

impl Drop for CardLockGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.card_id);
    }
}

/// Holds the card lock and resets the operation's busy flag when dropped.
struct InFlight {
    _lock: CardLockGuard,
    status: Arc<watch::Sender<EditorStatus>>,
    operation: EditorOperation,
}

impl InFlight {
    fn enter(&self, state: OperationState) {
        self.status.send_modify(|status| status.set(self.operation, state));
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.enter(OperationState::Idle);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorProps {
    pub card_id: CardId,
    /// Backend name of the text field being edited.
    pub field: String,
    /// Human-readable label of the text field.
    pub field_name: String,
    pub photo_field: String,
    pub photo: PhotoRef,
}

pub struct FieldPhotoEditor {
    props: EditorProps,
    backend: Arc<dyn CardBackend>,
    media: Arc<dyn MediaUploader>,
    dispatcher: Arc<dyn Dispatcher>,
    locks: CardLocks,
    slots: Mutex<HashMap<FormSlot, SlotValue>>,
    status: Arc<watch::Sender<EditorStatus>>,
}

impl FieldPhotoEditor {
    pub fn new(
        props: EditorProps,
        backend: Arc<dyn CardBackend>,
        media: Arc<dyn MediaUploader>,
        dispatcher: Arc<dyn Dispatcher>,
        locks: CardLocks,
    ) -> Self {
        let (status, _) = watch::channel(EditorStatus::default());
        Self {
            props,
            backend,
            media,
            dispatcher,
            locks,
            slots: Mutex::new(HashMap::new()),
            status: Arc::new(status),
        }
    }

    pub fn props(&self) -> &EditorProps {
        &self.props
    }

    pub fn status(&self) -> EditorStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<EditorStatus> {
        self.status.subscribe()
    }

    /// Add when the card has no photo yet, otherwise change.
    pub fn available_photo_action(&self) -> PhotoOperation {
        if self.props.photo.is_empty() {
            PhotoOperation::Add
        } else {
            PhotoOperation::Change
        }
    }

    pub fn preview_url(&self, height: u32) -> Option<String> {
        let public_id = self.props.photo.public_id()?;
        self.media.delivery_url(public_id, height)
    }

    pub async fn select_file(&self, slot: FormSlot, file: SelectedFile) {
        self.slots
            .lock()
            .await
            .insert(slot, SlotValue::Selected(file));
    }

    pub async fn clear_slot(&self, slot: FormSlot) {
        self.slots.lock().await.remove(&slot);
    }

    /// Public id held by `slot` after a successful upload whose commit has
    /// not gone through yet.
    pub async fn uploaded_public_id(&self, slot: FormSlot) -> Option<PublicId> {
        match self.slots.lock().await.get(&slot) {
            Some(SlotValue::Uploaded(public_id)) => Some(public_id.clone()),
            _ => None,
        }
    }

    fn begin(&self, operation: EditorOperation) -> Result<InFlight, EditorError> {
        let lock = self.locks.try_acquire(self.props.card_id, operation)?;
        Ok(InFlight {
            _lock: lock,
            status: Arc::clone(&self.status),
            operation,
        })
    }

    /// Sends the new value and invalidates the card cache whatever the
    /// backend answered.
    pub async fn submit_edit_field(&self, value: impl Into<String>) -> Result<(), EditorError> {
        if self.props.field.trim().is_empty() {
            return Err(EditorError::InvalidField);
        }
        let in_flight = self.begin(EditorOperation::EditField)?;
        in_flight.enter(OperationState::Submitting);

        let request = EditFieldRequest {
            id: self.props.card_id,
            field: self.props.field.clone(),
            value: value.into(),
        };
        match self.backend.edit_field(request).await {
            Ok(()) => info!(
                "editor: field edited card={} field={}",
                self.props.card_id, self.props.field
            ),
            Err(err) => warn!(
                "editor: field edit failed card={} field={} error={err:#}",
                self.props.card_id, self.props.field
            ),
        }
        self.dispatcher.invalidate(CacheTag::Card);
        Ok(())
    }

    pub async fn submit_add_photo(&self) -> Result<PhotoOutcome, EditorError> {
        self.submit_photo(FormSlot::AddPhoto).await
    }

    /// Rejected without uploading when the card has no photo yet.
    pub async fn submit_change_photo(&self) -> Result<PhotoOutcome, EditorError> {
        if self.props.photo.is_empty() {
            return Err(EditorError::NoPhoto {
                card_id: self.props.card_id,
            });
        }
        self.submit_photo(FormSlot::ChangePhoto).await
    }

    async fn submit_photo(&self, slot: FormSlot) -> Result<PhotoOutcome, EditorError> {
        let Some(pending) = self.slots.lock().await.get(&slot).cloned() else {
            return Ok(PhotoOutcome::NothingSelected);
        };
        let in_flight = self.begin(slot.operation())?;

        let public_id = match pending {
            SlotValue::Uploaded(public_id) => {
                info!(
                    "editor: reusing uploaded asset card={} slot={slot} public_id={public_id}",
                    self.props.card_id
                );
                public_id
            }
            SlotValue::Selected(file) => {
                in_flight.enter(OperationState::Uploading);
                match self.media.upload(&file).await {
                    Ok(public_id) => {
                        let mut slots = self.slots.lock().await;
                        // A file picked during the upload replaces this one.
                        if slots.get(&slot).is_some_and(|held| held.is_selected(&file)) {
                            slots.insert(slot, SlotValue::Uploaded(public_id.clone()));
                        }
                        public_id
                    }
                    Err(err) => {
                        let message = format!("Error submitting {slot}: {err:#}");
                        error!(
                            "editor: upload failed card={} slot={slot} error={err:#}",
                            self.props.card_id
                        );
                        self.dispatcher.report_error(message.clone());
                        return Err(EditorError::Upload(message));
                    }
                }
            }
        };

        in_flight.enter(OperationState::Submitting);
        let result = match slot {
            FormSlot::AddPhoto => {
                self.backend
                    .add_photo(AddPhotoRequest {
                        id: self.props.card_id,
                        field: self.props.photo_field.clone(),
                        public_id: public_id.clone(),
                    })
                    .await
            }
            FormSlot::ChangePhoto => {
                self.backend
                    .change_photo(ChangePhotoRequest {
                        id: self.props.card_id,
                        field: self.props.photo_field.clone(),
                        old_public_id: self.props.photo.as_wire().to_string(),
                        new_public_id: public_id.clone(),
                    })
                    .await
            }
        };

        let operation = slot.photo_operation();
        match result {
            Ok(()) => {
                let mut slots = self.slots.lock().await;
                if slots.get(&slot).is_some_and(|held| held.is_uploaded(&public_id)) {
                    slots.remove(&slot);
                }
                drop(slots);
                self.dispatcher.invalidate(CacheTag::Card);
                info!(
                    "editor: photo {} committed card={} field={} public_id={public_id}",
                    operation.verb(),
                    self.props.card_id,
                    self.props.photo_field
                );
                if operation == PhotoOperation::Change {
                    info!(
                        "editor: previous asset no longer referenced public_id={}",
                        self.props.photo.as_wire()
                    );
                }
                Ok(PhotoOutcome::Committed(public_id))
            }
            Err(err) => {
                // The uploaded asset stays in the slot for a retry without re-upload.
                warn!(
                    "editor: uploaded asset left unreferenced card={} public_id={public_id}",
                    self.props.card_id
                );
                Err(self.report_backend_failure(operation, err))
            }
        }
    }

    /// Clears the backend reference only; the media asset itself is kept.
    pub async fn handle_delete_photo(&self) -> Result<(), EditorError> {
        let in_flight = self.begin(EditorOperation::DeletePhoto)?;
        in_flight.enter(OperationState::Submitting);

        let request = DeletePhotoRequest {
            id: self.props.card_id,
            field: self.props.photo_field.clone(),
            public_id: self.props.photo.as_wire().to_string(),
        };
        match self.backend.delete_photo(request).await {
            Ok(()) => {
                self.dispatcher.invalidate(CacheTag::Card);
                info!(
                    "editor: photo delete committed card={} field={}",
                    self.props.card_id, self.props.photo_field
                );
                Ok(())
            }
            Err(err) => Err(self.report_backend_failure(PhotoOperation::Delete, err)),
        }
    }

    fn report_backend_failure(&self, operation: PhotoOperation, err: anyhow::Error) -> EditorError {
        let message = format!(
            "Error while trying to {} the photo: {err:#}",
            operation.verb()
        );
        error!(
            "editor: photo {} failed card={} field={} error={err:#}",
            operation.verb(),
            self.props.card_id,
            self.props.photo_field
        );
        self.dispatcher.report_error(message.clone());
        EditorError::Backend(message)
    }
}
