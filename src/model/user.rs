use {
    serde::{Deserialize, Serialize},
    sqlx::FromRow,
    time::OffsetDateTime,
};

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
