use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{User, UserId, UserPayload},
    error::StoreError,
};
use tracing::{debug, warn};
use url::Url;

/// Collection the console talks to when nothing else is configured.
pub const DEFAULT_STORE_URL: &str =
    "https://68ea1b4ff1eeb3f856e62e2c.mockapi.io/users/v1/usermanagementsystem";

/// CRUD access to the remote user collection.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn create(&self, payload: &UserPayload) -> Result<User, StoreError>;
    async fn update(&self, id: &UserId, payload: &UserPayload) -> Result<User, StoreError>;
    async fn delete(&self, id: &UserId) -> Result<(), StoreError>;

    /// Ids of every stored record, including ones `list` cannot decode.
    async fn list_ids(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.list().await?.into_iter().map(|user| user.id).collect())
    }
}

/// REST-backed store: `GET|POST {base}` and `PUT|DELETE {base}/{id}`.
pub struct HttpRecordStore {
    http: Client,
    base_url: Url,
}

impl HttpRecordStore {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, StoreError> {
        if base_url.cannot_be_a_base() {
            return Err(StoreError::transport(format!(
                "store url '{base_url}' cannot address records"
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { http, base_url })
    }

    async fn fetch_all(&self) -> Result<Vec<serde_json::Value>, StoreError> {
        debug!(url = %self.base_url, "store: list users");
        let response = self
            .http
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(transport)?;
        check_status(response, None)
            .await?
            .json()
            .await
            .map_err(transport)
    }

    fn record_url(&self, id: &UserId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id.as_str());
        }
        url
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let raw = self.fetch_all().await?;
        let total = raw.len();
        let users: Vec<User> = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<User>(value) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!("store: skipping malformed user record: {err}");
                    None
                }
            })
            .collect();
        debug!(total, decoded = users.len(), "store: users listed");
        Ok(users)
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, StoreError> {
        let raw = self.fetch_all().await?;
        Ok(raw
            .into_iter()
            .filter_map(|mut value| {
                let id = value.get_mut("id").map(serde_json::Value::take)?;
                match serde_json::from_value::<UserId>(id) {
                    Ok(id) => Some(id),
                    Err(err) => {
                        warn!("store: record without a usable id: {err}");
                        None
                    }
                }
            })
            .collect())
    }

    async fn create(&self, payload: &UserPayload) -> Result<User, StoreError> {
        debug!(username = %payload.username, "store: create user");
        let response = self
            .http
            .post(self.base_url.clone())
            .json(payload)
            .send()
            .await
            .map_err(transport)?;
        check_status(response, None)
            .await?
            .json()
            .await
            .map_err(transport)
    }

    async fn update(&self, id: &UserId, payload: &UserPayload) -> Result<User, StoreError> {
        debug!(user_id = %id, "store: update user");
        let response = self
            .http
            .put(self.record_url(id))
            .json(payload)
            .send()
            .await
            .map_err(transport)?;
        check_status(response, Some(id))
            .await?
            .json()
            .await
            .map_err(transport)
    }

    async fn delete(&self, id: &UserId) -> Result<(), StoreError> {
        debug!(user_id = %id, "store: delete user");
        let response = self
            .http
            .delete(self.record_url(id))
            .send()
            .await
            .map_err(transport)?;
        check_status(response, Some(id)).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

async fn check_status(response: Response, id: Option<&UserId>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", body.trim())
    };

    Err(match id {
        Some(id) if status == StatusCode::NOT_FOUND => StoreError::NotFound(id.clone()),
        _ if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY => {
            StoreError::Validation(detail)
        }
        _ => StoreError::Transport(detail),
    })
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
