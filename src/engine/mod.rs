use axum::{async_trait, http::HeaderMap};

use crate::{model::Session, Error};

mod backend;
mod fetch;

pub use {
    backend::Backend,
    fetch::{FetchOptions, Notifier, TracingNotifier, RATE_LIMIT_MESSAGE},
};

/// Resolves the session attached to a request.
///
/// `Ok(None)` means the request carries no valid session. `Err` is reserved for
/// failures of the lookup itself.
#[async_trait]
pub trait AuthEngine: Send + Sync {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Session>, Error>;
}
