use std::collections::HashMap;

use {
    oauth2::{ClientId, ClientSecret},
    serde_json::{Map, Value},
    tracing::debug,
    typed_builder::TypedBuilder,
};

use crate::{util::ProviderConfig, Env};

/// Describes a social sign-in provider and the environment variables that
/// must both be set for it to be enabled.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ProviderDescriptor {
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub display_name: String,
    #[builder(setter(into))]
    pub client_id_var: String,
    #[builder(setter(into))]
    pub client_secret_var: String,
    #[builder(setter(into))]
    pub auth_uri: String,
    #[builder(setter(into))]
    pub token_uri: String,
    #[builder(setter(into))]
    pub userinfo_uri: String,
    #[builder(default)]
    pub scopes: Vec<String>,
    /// Extra authorization request parameters, passed through verbatim.
    #[builder(default)]
    pub extra: Map<String, Value>,
}

impl ProviderDescriptor {
    /// Returns the provider configuration when both credentials are present.
    pub fn resolve(&self, env: &Env) -> Option<ProviderConfig> {
        let client_id = env.get(&self.client_id_var)?;
        let client_secret = env.get(&self.client_secret_var)?;

        Some(ProviderConfig {
            display_name: self.display_name.clone(),
            client_id: ClientId::new(client_id.to_string()),
            client_secret: ClientSecret::new(client_secret.to_string()),
            auth_uri: self.auth_uri.clone(),
            token_uri: self.token_uri.clone(),
            userinfo_uri: self.userinfo_uri.clone(),
            scopes: self.scopes.clone(),
            extra: self.extra.clone(),
        })
    }
}

pub fn github() -> ProviderDescriptor {
    ProviderDescriptor::builder()
        .name("github")
        .display_name("GitHub")
        .client_id_var("GITHUB_CLIENT_ID")
        .client_secret_var("GITHUB_CLIENT_SECRET")
        .auth_uri("https://github.com/login/oauth/authorize")
        .token_uri("https://github.com/login/oauth/access_token")
        .userinfo_uri("https://api.github.com/user")
        .scopes(vec!["read:user".to_string(), "user:email".to_string()])
        .build()
}

pub fn google() -> ProviderDescriptor {
    let mut extra = Map::new();
    extra.insert("prompt".to_string(), Value::from("select_account"));

    ProviderDescriptor::builder()
        .name("google")
        .display_name("Google")
        .client_id_var("GOOGLE_CLIENT_ID")
        .client_secret_var("GOOGLE_CLIENT_SECRET")
        .auth_uri("https://accounts.google.com/o/oauth2/v2/auth")
        .token_uri("https://oauth2.googleapis.com/token")
        .userinfo_uri("https://openidconnect.googleapis.com/v1/userinfo")
        .scopes(vec![
            "openid".to_string(),
            "profile".to_string(),
            "email".to_string(),
        ])
        .extra(extra)
        .build()
}

/// The providers recognised out of the box, in trusted-list order.
pub fn default_descriptors() -> Vec<ProviderDescriptor> {
    vec![github(), google()]
}

/// The provider map and the trusted-provider list, derived together so a
/// provider is in one exactly when it is in the other.
#[derive(Debug, Clone, Default)]
pub struct SocialProviders {
    pub providers: HashMap<String, ProviderConfig>,
    pub trusted: Vec<String>,
}

impl SocialProviders {
    pub fn from_env(env: &Env, descriptors: &[ProviderDescriptor]) -> Self {
        let mut social = Self::default();

        for descriptor in descriptors {
            if let Some(provider) = descriptor.resolve(env) {
                debug!(provider = %descriptor.name, "Social provider enabled");
                social.providers.insert(descriptor.name.clone(), provider);
                social.trusted.push(descriptor.name.clone());
            } else {
                debug!(provider = %descriptor.name, "Social provider credentials missing, skipping");
            }
        }

        social
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Env {
        pairs.iter().copied().collect()
    }

    #[test]
    fn both_providers_enabled_in_descriptor_order() {
        let env = env(&[
            ("GOOGLE_CLIENT_ID", "google_id"),
            ("GOOGLE_CLIENT_SECRET", "google_secret"),
            ("GITHUB_CLIENT_ID", "github_id"),
            ("GITHUB_CLIENT_SECRET", "github_secret"),
        ]);

        let social = SocialProviders::from_env(&env, &default_descriptors());
        assert_eq!(social.trusted, vec!["github", "google"]);
        assert_eq!(social.providers.len(), 2);

        let github = &social.providers["github"];
        assert_eq!(github.client_id, ClientId::new("github_id".to_string()));
        assert_eq!(github.client_secret.secret(), "github_secret");
        assert!(github.extra.is_empty());
    }

    #[test]
    fn provider_missing_a_credential_is_absent_everywhere() {
        let cases: [&[(&str, &str)]; 4] = [
            &[("GITHUB_CLIENT_ID", "id")],
            &[("GITHUB_CLIENT_SECRET", "secret")],
            &[("GITHUB_CLIENT_ID", ""), ("GITHUB_CLIENT_SECRET", "secret")],
            &[],
        ];

        for pairs in cases {
            let social = SocialProviders::from_env(&env(pairs), &default_descriptors());
            assert!(!social.providers.contains_key("github"), "{pairs:?}");
            assert!(!social.trusted.iter().any(|p| p == "github"), "{pairs:?}");
        }
    }

    #[test]
    fn map_and_trusted_list_always_agree() {
        let env = env(&[
            ("GITHUB_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]);

        let social = SocialProviders::from_env(&env, &default_descriptors());
        assert_eq!(social.trusted, vec!["google"]);
        let mut keys: Vec<_> = social.providers.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, social.trusted);
    }

    #[test]
    fn google_asks_for_account_selection() {
        let env = env(&[
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]);

        let social = SocialProviders::from_env(&env, &default_descriptors());
        assert_eq!(
            social.providers["google"].extra.get("prompt"),
            Some(&Value::from("select_account"))
        );
    }

    #[test]
    fn custom_descriptor_uses_its_own_variables() {
        let gitlab = ProviderDescriptor::builder()
            .name("gitlab")
            .display_name("GitLab")
            .client_id_var("GITLAB_CLIENT_ID")
            .client_secret_var("GITLAB_CLIENT_SECRET")
            .auth_uri("https://gitlab.com/oauth/authorize")
            .token_uri("https://gitlab.com/oauth/token")
            .userinfo_uri("https://gitlab.com/api/v4/user")
            .build();

        let env = env(&[
            ("GITLAB_CLIENT_ID", "id"),
            ("GITLAB_CLIENT_SECRET", "secret"),
            ("GITHUB_CLIENT_ID", "id"),
            ("GITHUB_CLIENT_SECRET", "secret"),
        ]);

        let social = SocialProviders::from_env(&env, &[gitlab]);
        assert_eq!(social.trusted, vec!["gitlab"]);
        assert_eq!(social.providers["gitlab"].display_name, "GitLab");
    }
}
