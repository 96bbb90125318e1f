use {
    serde::{Deserialize, Serialize},
    sqlx::FromRow,
    time::OffsetDateTime,
};

use super::User;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash, FromRow)]
pub struct SessionRecord {
    pub id: i64,
    /// Never serialized; the token only travels in the session cookie.
    #[serde(skip_serializing, default)]
    pub token: String,
    pub user_id: i64,
    pub expires_at: OffsetDateTime,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// An authenticated session together with the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Session {
    pub session: SessionRecord,
    pub user: User,
}
