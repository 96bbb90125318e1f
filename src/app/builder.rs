use std::{path::Path, str::FromStr as _, sync::Arc};

use {
    axum::{http::HeaderMap, middleware::from_fn_with_state, Router},
    axum_extra::extract::cookie::Cookie,
    sqlx::{
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
        SqlitePool,
    },
    tracing::{debug, info},
};

use crate::{
    engine::{Backend, FetchOptions, Notifier},
    web::{self, AuthState, SessionOutcome},
    Config, Env, Error,
};

use super::middleware::session::{require_session, session_cookie};

pub struct Builder {
    config: Config,
    fetch_options: FetchOptions,
    pool: Option<SqlitePool>,
}

impl Builder {
    /// # Errors
    ///
    /// This function will return an error if the config is invalid.
    pub fn new(config: Config) -> Result<Self, Error> {
        debug!("Initializing auth Builder with config: {:?}", config);
        config.validate()?;

        Ok(Self {
            config,
            fetch_options: FetchOptions::default(),
            pool: None,
        })
    }

    /// Assemble the configuration from the process environment. Variables in a
    /// `.env` file in the working directory are used when the process does not
    /// set them itself.
    ///
    /// # Errors
    ///
    /// Fails if `.env` exists but cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        let mut env = Env::from_process();

        if Path::new(".env").exists() {
            debug!("Loading .env file");
            env = Env::from_dotenv_file(".env")?.overlay(env);
        }

        Self::new(Config::from_env(&env))
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.fetch_options = FetchOptions::new(notifier);
        self
    }

    #[must_use]
    pub fn with_pool(mut self, pool: SqlitePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Connect to the database, run migrations and construct the engine.
    ///
    /// # Errors
    ///
    /// This function will return an error if the database cannot be opened or migrated.
    pub async fn build(self) -> Result<Auth, Error> {
        let db = match self.pool {
            Some(pool) => pool,
            None => connect(&self.config.database_url).await?,
        };

        debug!("Running database migrations");
        sqlx::migrate!().run(&db).await?;

        let config = Arc::new(self.config);
        let backend = Arc::new(Backend::new(db, config.clone(), self.fetch_options)?);

        info!(
            providers = ?config.account.account_linking.trusted_providers,
            secure_cookies = config.advanced.use_secure_cookies,
            sign_up = config.email_and_password.sign_up_allowed(),
            "Auth successfully initialized"
        );

        Ok(Auth { backend, config })
    }
}

async fn connect(database_url: &str) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Each connection to an in-memory database sees its own empty database.
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
    };

    Ok(pool.connect_with(options).await?)
}

/// The process-wide auth handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Auth {
    backend: Arc<Backend>,
    config: Arc<Config>,
}

impl Auth {
    pub const fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> AuthState {
        AuthState::new(self.backend.clone(), &self.config.routes.with_root().sign_in)
    }

    pub async fn get_session(&self, headers: &HeaderMap) -> SessionOutcome {
        web::get_session(self.backend.as_ref(), headers).await
    }

    /// Guard every route of `router`; unauthenticated requests are redirected
    /// to the sign-in route.
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(from_fn_with_state(self.state(), require_session))
    }

    pub fn session_cookie(&self, token: impl Into<String>) -> Cookie<'static> {
        session_cookie(&self.config, token)
    }
}
