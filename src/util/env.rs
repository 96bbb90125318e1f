use std::{collections::HashMap, path::Path};

use {
    serde::{Deserialize, Serialize},
    strum::{Display, EnumString, VariantNames},
};

use crate::Error;

/// An immutable snapshot of environment variables.
///
/// Values that are present but empty read as absent, so `FOO=` behaves the
/// same as an unset `FOO`.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    /// Snapshot the current process environment. Variables whose name or value
    /// is not valid unicode are skipped.
    #[must_use]
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    /// Read variables from a dotenv file without touching the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains a malformed line.
    pub fn from_dotenv_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let vars = dotenvy::from_path_iter(path)?.collect::<Result<HashMap<_, _>, _>>()?;
        Ok(Self { vars })
    }

    /// Returns a new snapshot where variables from `other` take precedence.
    #[must_use]
    pub fn overlay(mut self, other: Self) -> Self {
        self.vars.extend(other.vars);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// `true` only when the variable is `1` or `true`, ignoring case.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_enabled_flag)
    }

    /// `NODE_ENV`, falling back to `RUST_ENV`. Values are matched exactly, so
    /// `Production` is not production.
    pub fn run_mode(&self) -> RunMode {
        self.get("NODE_ENV")
            .or_else(|| self.get("RUST_ENV"))
            .map(RunMode::from_env_value)
            .unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for Env
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

fn is_enabled_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true")
}

#[derive(
    Default,
    Display,
    EnumString,
    VariantNames,
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Production,
    #[default]
    Development,
    Test,
}

impl RunMode {
    fn from_env_value(value: &str) -> Self {
        match value {
            "production" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }

    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn empty_values_read_as_absent() {
        let env: Env = [("GITHUB_CLIENT_ID", ""), ("GOOGLE_CLIENT_ID", "id")]
            .into_iter()
            .collect();
        assert_eq!(env.get("GITHUB_CLIENT_ID"), None);
        assert_eq!(env.get("GOOGLE_CLIENT_ID"), Some("id"));
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn flags_accept_one_and_true_in_any_case() {
        for value in ["1", "true", "TRUE", "True"] {
            let env: Env = [("DISABLE_SIGN_UP", value)].into_iter().collect();
            assert!(env.flag("DISABLE_SIGN_UP"), "{value} should be enabled");
        }
        for value in ["", "0", "no", "false", "yes", " 1"] {
            let env: Env = [("DISABLE_SIGN_UP", value)].into_iter().collect();
            assert!(!env.flag("DISABLE_SIGN_UP"), "{value} should be disabled");
        }
        assert!(!Env::default().flag("DISABLE_SIGN_UP"));
    }

    #[test]
    fn run_mode_prefers_node_env() {
        let env: Env = [("NODE_ENV", "production"), ("RUST_ENV", "test")]
            .into_iter()
            .collect();
        assert_eq!(env.run_mode(), RunMode::Production);

        let env: Env = [("RUST_ENV", "test")].into_iter().collect();
        assert_eq!(env.run_mode(), RunMode::Test);

        let env: Env = [("NODE_ENV", "staging")].into_iter().collect();
        assert_eq!(env.run_mode(), RunMode::Development);

        assert_eq!(Env::default().run_mode(), RunMode::Development);
    }

    #[test]
    fn run_mode_is_case_sensitive() {
        for value in ["Production", "PRODUCTION", " production"] {
            let env: Env = [("NODE_ENV", value)].into_iter().collect();
            assert_eq!(env.run_mode(), RunMode::Development, "{value:?}");
        }

        let env: Env = [("NODE_ENV", "Test")].into_iter().collect();
        assert_eq!(env.run_mode(), RunMode::Development);
    }

    #[test]
    fn overlay_prefers_the_newer_snapshot() {
        let base: Env = [("NO_HTTPS", "0"), ("NODE_ENV", "production")]
            .into_iter()
            .collect();
        let local: Env = [("NO_HTTPS", "1")].into_iter().collect();

        let merged = base.overlay(local);
        assert_eq!(merged.get("NO_HTTPS"), Some("1"));
        assert_eq!(merged.get("NODE_ENV"), Some("production"));
    }

    #[test]
    fn reads_dotenv_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "GITHUB_CLIENT_ID=gh_id").expect("write");
        writeln!(file, "GITHUB_CLIENT_SECRET=\"gh secret\"").expect("write");
        writeln!(file, "# comment").expect("write");
        writeln!(file, "DISABLE_SIGN_UP=TRUE").expect("write");

        let env = Env::from_dotenv_file(file.path()).expect("Failed to read dotenv file");
        assert_eq!(env.get("GITHUB_CLIENT_ID"), Some("gh_id"));
        assert_eq!(env.get("GITHUB_CLIENT_SECRET"), Some("gh secret"));
        assert!(env.flag("DISABLE_SIGN_UP"));
    }

    #[test]
    fn missing_dotenv_file_is_an_error() {
        let dir = tempfile::tempdir().expect("Failed to create a temporary directory");
        assert!(Env::from_dotenv_file(dir.path().join("absent.env")).is_err());
    }
}
