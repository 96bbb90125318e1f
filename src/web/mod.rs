use std::sync::Arc;

use {
    axum::{
        async_trait,
        extract::{FromRef, FromRequestParts},
        http::{request::Parts, HeaderMap},
        response::Redirect,
    },
    tracing::error,
};

use crate::{model::Session, AuthEngine};

/// The result of resolving a request's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Authenticated(Session),
    Unauthenticated,
}

impl SessionOutcome {
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unauthenticated => None,
        }
    }
}

/// Resolve the session for a request.
///
/// Lookup failures are logged and treated exactly like a missing session; the
/// caller only ever sees `Authenticated` or `Unauthenticated`.
pub async fn get_session<E>(engine: &E, headers: &HeaderMap) -> SessionOutcome
where
    E: AuthEngine + ?Sized,
{
    let session = engine.get_session(headers).await.unwrap_or_else(|err| {
        error!(err = %err, "Session lookup failed");
        None
    });

    session.map_or_else(
        || {
            error!("No session found");
            SessionOutcome::Unauthenticated
        },
        SessionOutcome::Authenticated,
    )
}

/// Handle to the engine plus the route unauthenticated requests are sent to.
#[derive(Clone)]
pub struct AuthState {
    engine: Arc<dyn AuthEngine>,
    sign_in: Arc<str>,
}

impl AuthState {
    pub fn new(engine: Arc<dyn AuthEngine>, sign_in: &str) -> Self {
        Self {
            engine,
            sign_in: sign_in.into(),
        }
    }

    pub fn engine(&self) -> &dyn AuthEngine {
        self.engine.as_ref()
    }

    pub fn sign_in(&self) -> &str {
        &self.sign_in
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("sign_in", &self.sign_in)
            .finish_non_exhaustive()
    }
}

/// Extracts the current session or redirects to the sign-in route.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Self(session.clone()));
        }

        let auth = AuthState::from_ref(state);
        match get_session(auth.engine(), &parts.headers).await {
            SessionOutcome::Authenticated(session) => Ok(Self(session)),
            SessionOutcome::Unauthenticated => Err(Redirect::temporary(auth.sign_in())),
        }
    }
}
