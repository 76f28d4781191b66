use serde::{Deserialize, Serialize};

use crate::database::{Database, DatabaseQueryError, Record};
use crate::{define_relation, define_table};

use super::{now, Timestamp, Video};

/// An account that can upload videos. The password hash never leaves the database.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: Record<User>,
    pub created_at: Timestamp,
    pub username: String,
    #[serde(default)]
    pub videos: Vec<Record<Video>>,
}

define_table!("users" : User);

define_relation! {
    User > find(id: &Record<User>) > Option<User>
        where "SELECT * FROM $id"
}

define_relation! {
    User > by_username(username: &str) > Option<User>
        where "SELECT * FROM users WHERE username = $username LIMIT 1"
}

define_relation! {
    User > verify(username: &str, password: &str) > Option<User>
        where "SELECT * FROM users WHERE username = $username AND crypto::argon2::compare(password, $password) LIMIT 1"
}

define_relation! {
    User > insert(username: &str, password: &str, created_at: Timestamp) > Option<User>
        where "CREATE users SET username = $username, password = crypto::argon2::generate($password), created_at = $created_at, videos = [] RETURN AFTER"
}

impl User {
    /// Creates an account, hashing the password inside the database.
    pub async fn signup(
        username: &str,
        password: &str,
        db: &Database,
    ) -> Result<Option<User>, DatabaseQueryError> {
        let user = Self::insert(username, password, now(), db).await?;

        if let Some(user) = &user {
            tracing::info!(user_id = %user.id, username, "created a new account");
        }

        Ok(user)
    }
}
