use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration as StdDuration,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::{
    sync::{Barrier, Notify},
    time::timeout,
};
use shared::{
    domain::{Role, Status, User, UserId, UserPayload},
    error::StoreError,
};

use crate::{
    mutation::{Clock, Confirm, ConfirmPrompt, Notice, Notifier},
    store::RecordStore,
};

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).single().expect("valid epoch")
}

pub(crate) fn user(id: i64, name: &str, role: Role, status: Status) -> User {
    let slug = name.to_lowercase().replace(' ', ".");
    User {
        id: UserId::from(id),
        name: name.to_string(),
        email: format!("{slug}@example.com"),
        username: slug.replace('.', "_"),
        role,
        status,
        joined_date: epoch() + Duration::days(id),
        last_active: epoch() + Duration::days(id + 30),
    }
}

pub(crate) fn numbered_users(count: i64) -> Vec<User> {
    (1..=count)
        .map(|id| user(id, &format!("Member {id}"), Role::User, Status::Active))
        .collect()
}

pub(crate) fn ids(raw: &[i64]) -> Vec<UserId> {
    raw.iter().copied().map(UserId::from).collect()
}

/// In-memory store with failure injection and call counting.
pub(crate) struct TestStore {
    users: Mutex<Vec<User>>,
    next_id: AtomicI64,
    failing_deletes: HashSet<UserId>,
    create_error: Option<StoreError>,
    list_error: Mutex<Option<StoreError>>,
    list_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    last_payload: Mutex<Option<UserPayload>>,
}

impl TestStore {
    pub(crate) fn with_users(users: Vec<User>) -> Self {
        let next_id = users
            .iter()
            .filter_map(|user| user.id.as_str().parse::<i64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            users: Mutex::new(users),
            next_id: AtomicI64::new(next_id),
            failing_deletes: HashSet::new(),
            create_error: None,
            list_error: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
        }
    }

    pub(crate) fn failing_delete(mut self, id: i64) -> Self {
        self.failing_deletes.insert(UserId::from(id));
        self
    }

    pub(crate) fn failing_create(mut self, err: StoreError) -> Self {
        self.create_error = Some(err);
        self
    }

    pub(crate) fn fail_next_list(&self, err: StoreError) {
        *self.list_error.lock().expect("list error lock") = Some(err);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_payload(&self) -> Option<UserPayload> {
        self.last_payload.lock().expect("payload lock").clone()
    }

    pub(crate) fn snapshot(&self) -> Vec<User> {
        self.users.lock().expect("users lock").clone()
    }
}

#[async_trait]
impl RecordStore for TestStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error.lock().expect("list error lock").take() {
            return Err(err);
        }
        Ok(self.snapshot())
    }

    async fn create(&self, payload: &UserPayload) -> Result<User, StoreError> {
        *self.last_payload.lock().expect("payload lock") = Some(payload.clone());
        if let Some(err) = &self.create_error {
            return Err(err.clone());
        }
        let id = UserId::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let created = payload.clone().into_user(id);
        self.users.lock().expect("users lock").push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &UserId, payload: &UserPayload) -> Result<User, StoreError> {
        *self.last_payload.lock().expect("payload lock") = Some(payload.clone());
        let mut users = self.users.lock().expect("users lock");
        let slot = users
            .iter_mut()
            .find(|user| &user.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        *slot = payload.clone().into_user(id.clone());
        Ok(slot.clone())
    }

    async fn delete(&self, id: &UserId) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.contains(id) {
            return Err(StoreError::transport(format!("connection reset deleting {id}")));
        }
        let mut users = self.users.lock().expect("users lock");
        let before = users.len();
        users.retain(|user| &user.id != id);
        if users.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}

/// Deletes wait for each other at a barrier and give up after two seconds,
/// so they only succeed when issued together.
pub(crate) struct RendezvousStore {
    inner: TestStore,
    barrier: Barrier,
    settled_deletes: AtomicUsize,
    settled_at_list: Mutex<Vec<usize>>,
}

impl RendezvousStore {
    pub(crate) fn new(inner: TestStore, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            settled_deletes: AtomicUsize::new(0),
            settled_at_list: Mutex::new(Vec::new()),
        }
    }

    /// Finished deletes as seen by each `list` call, in call order.
    pub(crate) fn settled_at_list(&self) -> Vec<usize> {
        self.settled_at_list.lock().expect("list log lock").clone()
    }
}

#[async_trait]
impl RecordStore for RendezvousStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.settled_at_list
            .lock()
            .expect("list log lock")
            .push(self.settled_deletes.load(Ordering::SeqCst));
        self.inner.list().await
    }

    async fn create(&self, payload: &UserPayload) -> Result<User, StoreError> {
        self.inner.create(payload).await
    }

    async fn update(&self, id: &UserId, payload: &UserPayload) -> Result<User, StoreError> {
        self.inner.update(id, payload).await
    }

    async fn delete(&self, id: &UserId) -> Result<(), StoreError> {
        timeout(StdDuration::from_secs(2), self.barrier.wait())
            .await
            .map_err(|_| StoreError::transport(format!("delete of {id} was issued alone")))?;
        let result = self.inner.delete(id).await;
        self.settled_deletes.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Holds every delete until the test releases it.
pub(crate) struct GatedStore {
    inner: TestStore,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    pub(crate) fn new(inner: TestStore) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    pub(crate) async fn wait_for_delete(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.inner.list().await
    }

    async fn create(&self, payload: &UserPayload) -> Result<User, StoreError> {
        self.inner.create(payload).await
    }

    async fn update(&self, id: &UserId, payload: &UserPayload) -> Result<User, StoreError> {
        self.inner.update(id, payload).await
    }

    async fn delete(&self, id: &UserId) -> Result<(), StoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.delete(id).await
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notices lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("notices lock").push(notice);
    }
}

pub(crate) struct ScriptedConfirm {
    answer: bool,
    prompts: Mutex<Vec<ConfirmPrompt>>,
}

impl ScriptedConfirm {
    pub(crate) fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<ConfirmPrompt> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        self.prompts.lock().expect("prompts lock").push(prompt.clone());
        self.answer
    }
}

/// Advances one minute per reading, starting well after every fixture date.
pub(crate) struct StepClock {
    ticks: AtomicI64,
}

impl StepClock {
    pub(crate) fn new() -> Self {
        Self {
            ticks: AtomicI64::new(0),
        }
    }

    pub(crate) fn start() -> DateTime<Utc> {
        epoch() + Duration::days(365)
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        Self::start() + Duration::minutes(tick)
    }
}
