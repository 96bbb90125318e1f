mod config;
mod env;

pub use {
    config::{
        AccountConfig, AccountLinkingConfig, AdvancedConfig, Config, CookieCacheConfig,
        DatabaseConfig, EmailAndPasswordConfig, ProviderConfig, Routes, SameSiteConfig,
        SessionConfig,
    },
    env::{Env, RunMode},
};
