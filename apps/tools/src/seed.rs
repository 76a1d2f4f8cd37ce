//! Random but realistic directory fixtures.

use chrono::{DateTime, Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use shared::domain::{Role, Status, UserPayload};

const FIRST_NAMES: [&str; 6] = ["Alice", "Bob", "Charlie", "Diana", "Ethan", "Fiona"];
const LAST_NAMES: [&str; 5] = ["Smith", "Johnson", "Williams", "Brown", "Jones"];

pub fn email_for(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("."))
}

pub fn username_for(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("_")
}

pub fn generate_user<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> UserPayload {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alice");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
    let name = format!("{first} {last}");

    let joined_date = now - Duration::days(rng.gen_range(0..365));
    let last_active = now
        - Duration::days(rng.gen_range(0..30))
        - Duration::hours(rng.gen_range(0..24))
        - Duration::minutes(rng.gen_range(0..60));

    UserPayload {
        email: email_for(&name),
        username: username_for(&name),
        name,
        role: Role::ALL.choose(rng).copied().unwrap_or_default(),
        status: Status::ALL.choose(rng).copied().unwrap_or_default(),
        joined_date,
        last_active,
    }
}

pub fn generate_users<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<UserPayload> {
    (0..count).map(|_| generate_user(rng, now)).collect()
}
