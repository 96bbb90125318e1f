use {
    axum::{
        extract::{Request, State},
        middleware::Next,
        response::{IntoResponse, Redirect, Response},
    },
    axum_extra::extract::cookie::{Cookie, SameSite},
    tracing::debug,
};

use crate::{
    util::SameSiteConfig,
    web::{get_session, AuthState, SessionOutcome},
    Config,
};

pub fn session_cookie_name(config: &Config) -> String {
    let name = format!("{}.session_token", config.advanced.cookie_prefix);
    if config.advanced.use_secure_cookies {
        format!("__Secure-{name}")
    } else {
        name
    }
}

const fn same_site(policy: SameSiteConfig) -> SameSite {
    match policy {
        SameSiteConfig::Strict => SameSite::Strict,
        SameSiteConfig::Lax => SameSite::Lax,
        SameSiteConfig::None => SameSite::None,
    }
}

/// The cookie that carries a session token back to the browser.
pub fn session_cookie(config: &Config, token: impl Into<String>) -> Cookie<'static> {
    debug!("Creating session cookie");

    Cookie::build((session_cookie_name(config), token.into()))
        .path("/")
        .http_only(true)
        .secure(config.advanced.use_secure_cookies)
        .same_site(same_site(config.session.same_site_policy))
        .max_age(config.session.expires_in())
        .build()
}

/// A cookie that clears the session cookie on sign-out.
pub fn removal_cookie(config: &Config) -> Cookie<'static> {
    let mut cookie = session_cookie(config, "");
    cookie.make_removal();
    cookie
}

/// Lets the request through only when it carries a session, which is then
/// available to handlers as `Extension<Session>`.
pub async fn require_session(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match get_session(state.engine(), req.headers()).await {
        SessionOutcome::Authenticated(session) => {
            debug!(user_id = session.user.id, "Authenticated user in session, continuing");
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        SessionOutcome::Unauthenticated => {
            debug!("User not authenticated, redirecting to {}", state.sign_in());
            Redirect::temporary(state.sign_in()).into_response()
        }
    }
}
