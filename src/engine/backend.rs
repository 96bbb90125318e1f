use std::{collections::HashMap, sync::Arc};

use {
    axum::{async_trait, http::HeaderMap},
    axum_extra::extract::cookie::CookieJar,
    oauth2::{basic::BasicClient, AuthUrl, CsrfToken, RedirectUrl, Scope, TokenUrl},
    reqwest::header::USER_AGENT,
    serde_json::Value,
    sqlx::SqlitePool,
    time::OffsetDateTime,
    tokio::sync::RwLock,
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    app::session_cookie_name,
    model::{Account, Session, SessionRecord, User},
    Config, Error,
};

use super::{AuthEngine, FetchOptions};

#[derive(Debug, Clone)]
struct CachedSession {
    session: Session,
    valid_until: OffsetDateTime,
}

/// SQLite-backed engine holding the configured OAuth clients.
#[derive(Debug)]
pub struct Backend {
    db: SqlitePool,
    config: Arc<Config>,
    oauth_providers: HashMap<String, BasicClient>,
    fetch_options: FetchOptions,
    http: reqwest::Client,
    cookie_cache: RwLock<HashMap<String, CachedSession>>,
}

impl Backend {
    /// # Errors
    ///
    /// Fails if the config does not validate, client-side id generation is
    /// requested or a provider URL is invalid.
    pub fn new(
        db: SqlitePool,
        config: Arc<Config>,
        fetch_options: FetchOptions,
    ) -> Result<Self, Error> {
        config.validate()?;

        if config.advanced.database.generate_id {
            return Err(Error::ConfigError(
                "client-side id generation is not supported, ids are assigned by the database"
                    .to_string(),
            ));
        }

        let callback_base = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            config.routes.with_root().auth_base
        );

        let mut oauth_providers = HashMap::new();
        for (provider_name, provider) in &config.social_providers {
            debug!("Configuring oauth client: {}", provider_name);

            let auth_url = AuthUrl::new(provider.auth_uri.clone())?;
            let token_url = TokenUrl::new(provider.token_uri.clone())?;
            let redirect_url = RedirectUrl::new(format!("{callback_base}/callback/{provider_name}"))?;

            let client = BasicClient::new(
                provider.client_id.clone(),
                Some(provider.client_secret.clone()),
                auth_url,
                Some(token_url),
            )
            .set_redirect_uri(redirect_url);

            oauth_providers.insert(provider_name.clone(), client);
        }

        Ok(Self {
            db,
            config,
            oauth_providers,
            fetch_options,
            http: reqwest::Client::new(),
            cookie_cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authorize_url(&self, provider: &str) -> Result<(Url, CsrfToken), Error> {
        let (oauth_client, provider_config) = self
            .oauth_providers
            .get(provider)
            .zip(self.config.social_providers.get(provider))
            .ok_or_else(|| Error::ProviderNotFoundError(provider.to_string()))?;

        let mut request = oauth_client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(provider_config.scopes.iter().cloned().map(Scope::new));

        for (name, value) in &provider_config.extra {
            let value = value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_string);
            request = request.add_extra_param(name.clone(), value);
        }

        Ok(request.url())
    }

    /// Fetch the provider's userinfo document with an access token obtained
    /// elsewhere.
    pub async fn fetch_user_info(&self, provider: &str, access_token: &str) -> Result<Value, Error> {
        let provider_config = self
            .config
            .social_providers
            .get(provider)
            .ok_or_else(|| Error::ProviderNotFoundError(provider.to_string()))?;

        let response = self
            .http
            .get(&provider_config.userinfo_uri)
            .header(USER_AGENT, "auth-layer")
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(provider, %status, "Userinfo request failed");
            self.fetch_options.on_error(status);
            return Err(Error::Fetch {
                url: provider_config.userinfo_uri.clone(),
                status,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    pub async fn create_user(&self, name: &str, email: &str) -> Result<User, Error> {
        if !self.config.email_and_password.sign_up_allowed() {
            warn!(email, "Sign up attempted while disabled");
            return Err(Error::SignUpDisabled);
        }

        let now = OffsetDateTime::now_utc();
        let user: User = sqlx::query_as(
            r"
            insert into users (name, email, email_verified, created_at, updated_at)
            values (?, ?, false, ?, ?)
            returning *
            ",
        )
        .bind(name)
        .bind(email)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        info!(user_id = user.id, "User created");
        Ok(user)
    }

    /// Persist a session for a token issued by the caller.
    pub async fn create_session(&self, user_id: i64, token: &str) -> Result<SessionRecord, Error> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.config.session.expires_in();

        let record: SessionRecord = sqlx::query_as(
            r"
            insert into sessions (token, user_id, expires_at, created_at, updated_at)
            values (?, ?, ?, ?, ?)
            returning *
            ",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        debug!(session_id = record.id, user_id, "Session created");
        Ok(record)
    }

    pub async fn revoke_session(&self, token: &str) -> Result<(), Error> {
        self.cookie_cache.write().await.remove(token);

        sqlx::query("delete from sessions where token = ?")
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Untrusted providers may only link to users with a verified email.
    pub async fn link_account(
        &self,
        user: &User,
        provider: &str,
        account_id: &str,
    ) -> Result<Account, Error> {
        let provider_config = self
            .config
            .social_providers
            .get(provider)
            .ok_or_else(|| Error::ProviderNotFoundError(provider.to_string()))?;

        if !self.config.is_trusted_provider(provider) && !user.email_verified {
            warn!(provider, user_id = user.id, "Refusing to link untrusted provider");
            return Err(Error::AccountLinkingError {
                provider: provider.to_string(),
                reason: "email address is not verified".to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let account: Account = sqlx::query_as(
            r"
            insert into accounts (user_id, provider_id, account_id, scope, created_at, updated_at)
            values (?, ?, ?, ?, ?, ?)
            returning id, user_id, provider_id, account_id, scope, created_at, updated_at
            ",
        )
        .bind(user.id)
        .bind(provider)
        .bind(account_id)
        .bind(provider_config.scopes.join(" "))
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        info!(provider, user_id = user.id, "Account linked");
        Ok(account)
    }

    async fn find_session(&self, token: &str) -> Result<Option<SessionRecord>, Error> {
        Ok(sqlx::query_as("select * from sessions where token = ?")
            .bind(token)
            .fetch_optional(&self.db)
            .await?)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, Error> {
        Ok(sqlx::query_as("select * from users where id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?)
    }

    // The expiry was last set `expires_in - remaining` ago.
    fn needs_refresh(&self, record: &SessionRecord, now: OffsetDateTime) -> bool {
        let session = &self.config.session;
        record.expires_at - session.expires_in() + session.update_age() <= now
    }

    async fn refresh_session(
        &self,
        record: SessionRecord,
        now: OffsetDateTime,
    ) -> Result<SessionRecord, Error> {
        let expires_at = now + self.config.session.expires_in();

        let refreshed: SessionRecord = sqlx::query_as(
            r"
            update sessions
            set expires_at = ?, updated_at = ?
            where id = ?
            returning *
            ",
        )
        .bind(expires_at)
        .bind(now)
        .bind(record.id)
        .fetch_one(&self.db)
        .await?;

        debug!(session_id = refreshed.id, "Session expiry refreshed");
        Ok(refreshed)
    }

    async fn cached_session(&self, token: &str, now: OffsetDateTime) -> Option<Session> {
        if !self.config.session.cookie_cache.enabled {
            return None;
        }

        self.cookie_cache
            .read()
            .await
            .get(token)
            .filter(|cached| cached.valid_until > now)
            .map(|cached| cached.session.clone())
    }

    async fn cache_session(&self, token: &str, session: &Session, now: OffsetDateTime) {
        if !self.config.session.cookie_cache.enabled {
            return;
        }

        let valid_until = (now + self.config.session.cookie_cache_max_age())
            .min(session.session.expires_at);

        let mut cache = self.cookie_cache.write().await;
        cache.retain(|_, cached| cached.valid_until > now);
        cache.insert(
            token.to_string(),
            CachedSession {
                session: session.clone(),
                valid_until,
            },
        );
    }
}

#[async_trait]
impl AuthEngine for Backend {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Session>, Error> {
        let cookie_name = session_cookie_name(&self.config);
        let Some(token) = CookieJar::from_headers(headers)
            .get(&cookie_name)
            .map(|cookie| cookie.value().to_string())
        else {
            debug!("No session cookie on request");
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();

        if let Some(session) = self.cached_session(&token, now).await {
            debug!(session_id = session.session.id, "Session served from cookie cache");
            return Ok(Some(session));
        }

        let Some(mut record) = self.find_session(&token).await? else {
            debug!("Unknown session token");
            return Ok(None);
        };

        if record.is_expired_at(now) {
            debug!(session_id = record.id, "Session expired, removing");
            self.revoke_session(&token).await?;
            return Ok(None);
        }

        if self.needs_refresh(&record, now) {
            record = self.refresh_session(record, now).await?;
        }

        let Some(user) = self.find_user(record.user_id).await? else {
            warn!(session_id = record.id, user_id = record.user_id, "Session without user");
            return Ok(None);
        };

        let session = Session {
            session: record,
            user,
        };
        self.cache_session(&token, &session, now).await;

        Ok(Some(session))
    }
}
