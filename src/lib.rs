#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

mod app;
mod engine;
mod error;
pub mod model;
pub mod providers;
mod util;
mod web;

pub use {
    app::{removal_cookie, require_session, session_cookie, session_cookie_name, Auth, Builder},
    engine::{AuthEngine, Backend, FetchOptions, Notifier, TracingNotifier, RATE_LIMIT_MESSAGE},
    error::Error,
    util::{
        AccountConfig, AccountLinkingConfig, AdvancedConfig, Config, CookieCacheConfig,
        DatabaseConfig, EmailAndPasswordConfig, Env, ProviderConfig, Routes, RunMode,
        SameSiteConfig, SessionConfig,
    },
    web::{get_session, AuthState, RequireSession, SessionOutcome},
};
