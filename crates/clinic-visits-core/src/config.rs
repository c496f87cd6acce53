//! Runtime configuration.
//!
//! Resolved once at startup and passed into the store, identity session and
//! controller. Business logic never reads the process environment.

use thiserror::Error;

/// Substrings that mark a store URL as an unedited template value.
const PLACEHOLDER_MARKERS: [&str; 2] = ["xyzcompany", "PLACEHOLDER"];

/// Default application id when none is configured.
pub const DEFAULT_APP_ID: &str = "clinic-app";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Where the visit store lives and how to authenticate against it.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    pub url: String,
    pub anon_key: Option<String>,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, anon_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            anon_key,
        }
    }

    /// True when the URL still carries a template placeholder.
    pub fn is_placeholder(&self) -> bool {
        PLACEHOLDER_MARKERS
            .iter()
            .any(|marker| self.url.contains(marker))
    }
}

/// Identity provider settings.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityConfig {
    /// Subject to sign in as
    pub subject: Option<String>,
    /// Fall back to an anonymous session when no subject is configured
    pub allow_anonymous: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            subject: None,
            allow_anonymous: true,
        }
    }
}

/// Configuration resolved at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct ClinicConfig {
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub app_id: String,
}

impl ClinicConfig {
    pub fn new(store: StoreConfig, identity: IdentityConfig) -> Self {
        Self {
            store,
            identity,
            app_id: DEFAULT_APP_ID.to_string(),
        }
    }

    /// Configuration for an in-memory store with anonymous identity.
    pub fn in_memory() -> Self {
        Self::new(
            StoreConfig::new("sqlite::memory:", None),
            IdentityConfig::default(),
        )
    }

    /// Load from the environment, reading a `.env` file first if present.
    ///
    /// # Environment Variables
    /// - `CLINIC_STORE_URL` (required)
    /// - `CLINIC_STORE_ANON_KEY`
    /// - `CLINIC_IDENTITY_SUBJECT`
    /// - `CLINIC_IDENTITY_ANONYMOUS` (default: "true")
    /// - `CLINIC_APP_ID` (default: "clinic-app")
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = get("CLINIC_STORE_URL").ok_or(ConfigError::Missing("CLINIC_STORE_URL"))?;

        Ok(Self {
            store: StoreConfig::new(url, get("CLINIC_STORE_ANON_KEY")),
            identity: IdentityConfig {
                subject: get("CLINIC_IDENTITY_SUBJECT"),
                allow_anonymous: get("CLINIC_IDENTITY_ANONYMOUS")
                    .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                    .unwrap_or(true),
            },
            app_id: get("CLINIC_APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
        })
    }

    /// User-facing warning when the store is still configured with template
    /// credentials. Never blocks startup.
    pub fn warning(&self) -> Option<String> {
        if self.store.is_placeholder() {
            Some(
                "The store URL is a placeholder; visits will not be saved. \
                 Set CLINIC_STORE_URL in your .env file."
                    .to_string(),
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = ClinicConfig::from_lookup(lookup(&[
            ("CLINIC_STORE_URL", "sqlite://clinic.db"),
            ("CLINIC_STORE_ANON_KEY", "anon-key"),
            ("CLINIC_IDENTITY_SUBJECT", ""),
            ("CLINIC_IDENTITY_ANONYMOUS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.store.url, "sqlite://clinic.db");
        assert_eq!(config.store.anon_key.as_deref(), Some("anon-key"));
        assert_eq!(config.identity.subject, None);
        assert!(!config.identity.allow_anonymous);
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.warning(), None);
    }

    #[test]
    fn test_defaults() {
        let config =
            ClinicConfig::from_lookup(lookup(&[("CLINIC_STORE_URL", "sqlite::memory:")])).unwrap();
        assert!(config.identity.allow_anonymous);
        assert_eq!(config.store.anon_key, None);
    }

    #[test]
    fn test_missing_store_url() {
        assert_eq!(
            ClinicConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("CLINIC_STORE_URL"))
        );
    }

    #[test]
    fn test_placeholder_warning() {
        for url in [
            "https://xyzcompany.supabase.co",
            "https://PLACEHOLDER.example.com",
        ] {
            let config = ClinicConfig::new(StoreConfig::new(url, None), IdentityConfig::default());
            assert!(config.store.is_placeholder());
            assert!(config.warning().is_some());
        }

        assert!(ClinicConfig::in_memory().warning().is_none());
    }
}
