mod builder;
mod middleware;

pub use {
    builder::{Auth, Builder},
    middleware::session::{removal_cookie, require_session, session_cookie, session_cookie_name},
};
