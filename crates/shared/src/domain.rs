use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::FieldError;

/// Store-assigned record identifier.
///
/// The store may hand ids out as JSON strings or numbers; both decode into the
/// same opaque string so equality never depends on the wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

macro_rules! labeled_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = FieldError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let raw = raw.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(raw))
                    .ok_or_else(|| FieldError::UnknownValue {
                        field: stringify!($name),
                        value: raw.to_string(),
                    })
            }
        }
    };
}

labeled_enum!(Role {
    Admin,
    User,
    Moderator,
    Guest,
});

labeled_enum!(Status {
    Active,
    Inactive,
    Banned,
    Pending,
    Suspended,
});

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Active
    }
}

/// A user record exactly as the store last reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    pub role: Role,
    pub status: Status,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub joined_date: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_active: DateTime<Utc>,
}

/// Reads an RFC 3339 timestamp, an offset-less date-time, or a bare
/// `YYYY-MM-DD` date. The last two are taken as UTC, a bare date at midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = raw.parse::<NaiveDateTime>() {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp '{raw}'")))
}

impl User {
    /// Editable fields of this record, used to prefill an edit.
    pub fn fields(&self) -> UserFields {
        UserFields {
            name: self.name.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
            status: self.status,
        }
    }
}

/// Fields an operator can set through the create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub status: Status,
}

impl UserFields {
    /// Required-field check; nothing beyond presence is validated.
    pub fn validate(&self) -> Result<(), FieldError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("username", &self.username),
        ] {
            if value.trim().is_empty() {
                return Err(FieldError::Missing(field));
            }
        }
        Ok(())
    }

    pub fn into_payload(
        self,
        joined_date: DateTime<Utc>,
        last_active: DateTime<Utc>,
    ) -> UserPayload {
        UserPayload {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            username: self.username.trim().to_string(),
            role: self.role,
            status: self.status,
            joined_date,
            last_active,
        }
    }
}

/// Body sent to the store on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub status: Status,
    pub joined_date: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl UserPayload {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            username: self.username,
            role: self.role,
            status: self.status,
            joined_date: self.joined_date,
            last_active: self.last_active,
        }
    }
}
