#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use {
    derivative::Derivative,
    oauth2::{ClientId, ClientSecret},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    strum::{Display, EnumString, VariantNames},
    time::Duration,
};

use crate::{
    providers::{default_descriptors, ProviderDescriptor, SocialProviders},
    Env, Error, RunMode,
};

#[derive(Debug, Serialize, Deserialize, Derivative, Clone)]
#[derivative(Default)]
#[serde(default)]
pub struct EmailAndPasswordConfig {
    #[derivative(Default(value = "true"))]
    pub enabled: bool,
    pub disable_sign_up: bool,
}

impl EmailAndPasswordConfig {
    pub const fn sign_up_allowed(&self) -> bool {
        self.enabled && !self.disable_sign_up
    }
}

#[derive(Debug, Serialize, Deserialize, Derivative, Clone)]
#[derivative(Default)]
#[serde(default)]
pub struct CookieCacheConfig {
    #[derivative(Default(value = "true"))]
    pub enabled: bool,
    /// Seconds a validated session may be served from the cache.
    #[derivative(Default(value = "60 * 60"))]
    pub max_age: u64,
}

#[derive(Debug, Serialize, Deserialize, Derivative, Clone)]
#[derivative(Default)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_cache: CookieCacheConfig,
    /// Absolute session lifetime in seconds.
    #[derivative(Default(value = "60 * 60 * 24 * 7"))]
    pub expires_in: u64,
    /// The expiry is pushed forward at most once per this many seconds.
    #[derivative(Default(value = "60 * 60 * 24"))]
    pub update_age: u64,
    pub same_site_policy: SameSiteConfig,
}

impl SessionConfig {
    pub fn expires_in(&self) -> Duration {
        seconds(self.expires_in)
    }

    pub fn update_age(&self) -> Duration {
        seconds(self.update_age)
    }

    pub fn cookie_cache_max_age(&self) -> Duration {
        seconds(self.cookie_cache.max_age)
    }
}

// 100 years; keeps `now + duration` well inside `OffsetDateTime`'s range.
const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

#[derive(
    Default, Display, EnumString, VariantNames, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SameSiteConfig {
    Strict,
    #[default]
    Lax,
    None,
}

#[derive(Default, Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// When `false` row ids are assigned by the database.
    pub generate_id: bool,
}

#[derive(Debug, Serialize, Deserialize, Derivative, Clone)]
#[derivative(Default)]
#[serde(default)]
pub struct AdvancedConfig {
    pub use_secure_cookies: bool,
    #[derivative(Default(value = "\"auth\".into()"))]
    pub cookie_prefix: String,
    pub database: DatabaseConfig,
}

#[derive(Default, Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AccountLinkingConfig {
    /// Providers whose linked accounts are accepted without email verification.
    pub trusted_providers: Vec<String>,
}

#[derive(Default, Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AccountConfig {
    pub account_linking: AccountLinkingConfig,
}

#[derive(Debug, Serialize, Deserialize, Derivative, Clone)]
#[derivative(Default)]
#[serde(default)]
pub struct Routes {
    #[derivative(Default(value = "\"/\".into()"))]
    pub root: String,
    #[derivative(Default(value = "String::new()"))]
    pub public_home: String,
    #[derivative(Default(value = "\"sign-in\".into()"))]
    pub sign_in: String,
    #[derivative(Default(value = "\"api/auth\".into()"))]
    pub auth_base: String,
}

impl Routes {
    /// Returns a new `Routes` struct with the `root` path prepended to all paths.
    pub fn with_root(&self) -> Self {
        let normalized_base = normalize_slash(&self.root);
        Self {
            root: normalized_base.clone(),
            public_home: join_paths(&normalized_base, &self.public_home),
            sign_in: join_paths(&normalized_base, &self.sign_in),
            auth_base: join_paths(&normalized_base, &self.auth_base),
        }
    }
}

fn normalize_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

fn join_paths(base: &str, path: &str) -> String {
    let trimmed_base = base.trim_end_matches('/');
    let trimmed_path = path.trim_start_matches('/');
    format!("{trimmed_base}/{trimmed_path}")
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProviderConfig {
    pub display_name: String,
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_uri: String,
    pub token_uri: String,
    pub userinfo_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Derivative, Clone)]
#[derivative(Default)]
#[serde(default)]
pub struct Config {
    pub run_mode: RunMode,
    #[derivative(Default(value = "\"sqlite::memory:\".into()"))]
    pub database_url: String,
    /// Public origin used to build OAuth redirect URIs.
    #[derivative(Default(value = "\"http://localhost:3000\".into()"))]
    pub base_url: String,
    pub email_and_password: EmailAndPasswordConfig,
    pub session: SessionConfig,
    pub advanced: AdvancedConfig,
    pub account: AccountConfig,
    pub social_providers: HashMap<String, ProviderConfig>,
    pub routes: Routes,
}

impl Config {
    /// Assemble the configuration from environment variables using the
    /// built-in GitHub and Google providers.
    pub fn from_env(env: &Env) -> Self {
        Self::from_env_with_providers(env, &default_descriptors())
    }

    pub fn from_env_with_providers(env: &Env, descriptors: &[ProviderDescriptor]) -> Self {
        let defaults = Self::default();
        let run_mode = env.run_mode();
        let social = SocialProviders::from_env(env, descriptors);

        Self {
            run_mode,
            database_url: env
                .get("DATABASE_URL")
                .map_or(defaults.database_url, str::to_string),
            base_url: env
                .get("BASE_URL")
                .map_or(defaults.base_url, str::to_string),
            email_and_password: EmailAndPasswordConfig {
                enabled: true,
                disable_sign_up: env.flag("DISABLE_SIGN_UP"),
            },
            advanced: AdvancedConfig {
                use_secure_cookies: use_secure_cookies(env, run_mode),
                ..defaults.advanced
            },
            account: AccountConfig {
                account_linking: AccountLinkingConfig {
                    trusted_providers: social.trusted,
                },
            },
            social_providers: social.providers,
            ..defaults
        }
    }

    /// Only the trusted-list side of the provider invariant is enforced: a
    /// hand-built config may configure a provider without trusting it, in which
    /// case linking that provider requires a verified email.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a trusted provider has no provider
    /// configuration or a session duration is zero or out of range.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(provider) = self
            .account
            .account_linking
            .trusted_providers
            .iter()
            .find(|name| !self.social_providers.contains_key(*name))
        {
            return Err(Error::ConfigError(format!(
                "trusted provider `{provider}` has no social provider configuration"
            )));
        }

        if self.session.expires_in == 0 {
            return Err(Error::ConfigError(
                "session.expires_in must be greater than zero".to_string(),
            ));
        }

        for (name, secs) in [
            ("session.expires_in", self.session.expires_in),
            ("session.update_age", self.session.update_age),
            ("session.cookie_cache.max_age", self.session.cookie_cache.max_age),
        ] {
            if secs > MAX_LIFETIME_SECS {
                return Err(Error::ConfigError(format!(
                    "{name} must be at most {MAX_LIFETIME_SECS} seconds"
                )));
            }
        }

        Ok(())
    }

    pub fn is_trusted_provider(&self, provider: &str) -> bool {
        self.account
            .account_linking
            .trusted_providers
            .iter()
            .any(|trusted| trusted == provider)
    }
}

// `NO_HTTPS=1` wins over production mode.
fn use_secure_cookies(env: &Env, run_mode: RunMode) -> bool {
    if env.get("NO_HTTPS") == Some("1") {
        false
    } else {
        run_mode.is_production()
    }
}
