use {
    serde::{Deserialize, Serialize},
    sqlx::FromRow,
    time::OffsetDateTime,
};

/// A social or credential account linked to a user.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, FromRow)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub provider_id: String,
    pub account_id: String,
    pub scope: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
