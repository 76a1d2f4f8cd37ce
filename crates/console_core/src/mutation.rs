//! Create/update/delete sequencing against the record store, followed by a
//! full refresh of the canonical set on success.

use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use shared::{
    domain::{User, UserFields, UserId},
    error::{FieldError, StoreError},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{list::ListController, store::RecordStore};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt {
    DeleteOne { id: UserId, name: Option<String> },
    DeleteMany { count: usize },
}

impl fmt::Display for ConfirmPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmPrompt::DeleteOne { name: Some(name), .. } => {
                write!(f, "Are you sure you want to delete {name}?")
            }
            ConfirmPrompt::DeleteOne { name: None, .. } => {
                f.write_str("Are you sure you want to delete this user?")
            }
            ConfirmPrompt::DeleteMany { count } => write!(f, "Delete {count} users?"),
        }
    }
}

/// Asked before any destructive store call.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: message.into(),
        }
    }
}

/// Receives one notice per finished action.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(usize),
    Declined,
    NothingSelected,
}

/// Per-id results of a bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub deleted: Vec<UserId>,
    pub failed: Vec<(UserId, StoreError)>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }

    pub fn summary(&self) -> String {
        let failed = self
            .failed
            .iter()
            .map(|(id, err)| format!("{id} ({err})"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "deleted {} of {} users; failed: {failed}",
            self.deleted.len(),
            self.attempted()
        )
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Invalid(#[from] FieldError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("user {0} is not in the loaded directory")]
    UnknownRecord(UserId),
    #[error("bulk delete incomplete: {}", .0.summary())]
    BulkDelete(BulkDeleteReport),
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MutationCoordinator {
    store: Arc<dyn RecordStore>,
    confirm: Arc<dyn Confirm>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    in_flight: AtomicUsize,
}

impl MutationCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        confirm: Arc<dyn Confirm>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            confirm,
            notifier,
            clock: Arc::new(SystemClock),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> MutationState {
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            MutationState::Idle
        } else {
            MutationState::InFlight
        }
    }

    fn begin(&self) -> InFlightGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(&self.in_flight)
    }

    /// Replaces the canonical set with the store's current contents.
    pub async fn refresh(&self, list: &mut ListController) -> Result<usize, StoreError> {
        match self.store.list().await {
            Ok(users) => {
                let count = users.len();
                list.replace_all(users);
                Ok(count)
            }
            Err(err) => {
                warn!("refresh failed: {err}");
                self.notifier
                    .notify(Notice::failure(format!("Failed to fetch users: {err}")));
                Err(err)
            }
        }
    }

    pub async fn create(
        &self,
        list: &mut ListController,
        fields: UserFields,
    ) -> Result<User, MutationError> {
        let _guard = self.begin();
        let result = self.send_create(fields).await;
        self.settle(list, result, "User added", "Save failed").await
    }

    async fn send_create(&self, fields: UserFields) -> Result<User, MutationError> {
        fields.validate()?;
        let now = self.clock.now();
        let created = self.store.create(&fields.into_payload(now, now)).await?;
        info!(user_id = %created.id, "user created");
        Ok(created)
    }

    /// `joinedDate` is carried over from the record being edited.
    pub async fn update(
        &self,
        list: &mut ListController,
        id: &UserId,
        fields: UserFields,
    ) -> Result<User, MutationError> {
        let _guard = self.begin();
        let joined_date = list.find(id).map(|user| user.joined_date);
        let result = self.send_update(id, joined_date, fields).await;
        self.settle(list, result, "User updated", "Save failed").await
    }

    async fn send_update(
        &self,
        id: &UserId,
        joined_date: Option<DateTime<Utc>>,
        fields: UserFields,
    ) -> Result<User, MutationError> {
        let joined_date = joined_date.ok_or_else(|| MutationError::UnknownRecord(id.clone()))?;
        fields.validate()?;
        let payload = fields.into_payload(joined_date, self.clock.now());
        let updated = self.store.update(id, &payload).await?;
        info!(user_id = %id, "user updated");
        Ok(updated)
    }

    pub async fn delete(
        &self,
        list: &mut ListController,
        id: &UserId,
    ) -> Result<DeleteOutcome, MutationError> {
        let prompt = ConfirmPrompt::DeleteOne {
            id: id.clone(),
            name: list.find(id).map(|user| user.name.clone()),
        };
        if !self.confirm.confirm(&prompt) {
            debug!(user_id = %id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        let _guard = self.begin();
        let result = self
            .store
            .delete(id)
            .await
            .map(|()| DeleteOutcome::Deleted(1))
            .map_err(MutationError::from);
        if result.is_ok() {
            info!(user_id = %id, "user deleted");
        }
        self.settle(list, result, "User deleted", "Delete failed").await
    }

    /// Deletes the current selection.
    pub async fn delete_selected(
        &self,
        list: &mut ListController,
    ) -> Result<DeleteOutcome, MutationError> {
        let ids = list.selection().to_vec();
        self.delete_many(list, &ids).await
    }

    /// Issues every delete concurrently; succeeds only if all of them do.
    /// Repeated ids are deleted once.
    pub async fn delete_many(
        &self,
        list: &mut ListController,
        ids: &[UserId],
    ) -> Result<DeleteOutcome, MutationError> {
        let mut seen = HashSet::new();
        let ids: Vec<&UserId> = ids.iter().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return Ok(DeleteOutcome::NothingSelected);
        }
        if !self
            .confirm
            .confirm(&ConfirmPrompt::DeleteMany { count: ids.len() })
        {
            debug!(count = ids.len(), "bulk delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        let _guard = self.begin();
        let results = join_all(ids.into_iter().map(|id| async move {
            let result = self.store.delete(id).await;
            (id.clone(), result)
        }))
        .await;

        let mut report = BulkDeleteReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.deleted.push(id),
                Err(err) => report.failed.push((id, err)),
            }
        }

        if !report.is_complete() {
            warn!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "bulk delete incomplete"
            );
            self.notifier
                .notify(Notice::failure(format!("Delete failed: {}", report.summary())));
            return Err(MutationError::BulkDelete(report));
        }

        let count = report.deleted.len();
        info!(count, "users deleted");
        list.clear_selection();
        self.notifier
            .notify(Notice::success(format!("{count} users deleted")));
        let _ = self.refresh(list).await;
        Ok(DeleteOutcome::Deleted(count))
    }

    async fn settle<T>(
        &self,
        list: &mut ListController,
        result: Result<T, MutationError>,
        success: &str,
        failure: &str,
    ) -> Result<T, MutationError> {
        match result {
            Ok(value) => {
                self.notifier.notify(Notice::success(success));
                let _ = self.refresh(list).await;
                Ok(value)
            }
            Err(err) => {
                warn!("{failure}: {err}");
                self.notifier
                    .notify(Notice::failure(format!("{failure}: {err}")));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
