//! Service endpoints, resolved from the environment.

use std::fmt;

const API_URL: &str = "https://api.ultradeck.co";
const APP_URL: &str = "https://app.ultradeck.co";
const WS_URL: &str = "ws://ws.ultradeck.co/";

const DEV_API_URL: &str = "http://localhost:3001";
const DEV_APP_URL: &str = "http://localhost:3000";
const DEV_WS_URL: &str = "ws://localhost:8080/";

/// Browser screen a deck can be opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Present,
    Edit,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Present => write!(f, "present"),
            Screen::Edit => write!(f, "edit"),
        }
    }
}

/// Base URLs of the deck backend, the web app and the channel server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api: String,
    pub app: String,
    pub ws: String,
}

impl Endpoints {
    /// Load endpoints from environment variables.
    ///
    /// - `DEV_MODE`: any non-empty value selects the localhost defaults
    /// - `DECK_API_URL`, `DECK_APP_URL`, `DECK_WS_URL`: override one endpoint
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve endpoints through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let dev_mode = lookup("DEV_MODE").is_some_and(|v| !v.is_empty());
        let (api, app, ws) = if dev_mode {
            (DEV_API_URL, DEV_APP_URL, DEV_WS_URL)
        } else {
            (API_URL, APP_URL, WS_URL)
        };

        let resolve = |var: &'static str, default: &str, schemes: &[&str]| {
            match lookup(var).filter(|v| !v.is_empty()) {
                Some(value) if schemes.iter().any(|s| value.starts_with(s)) => Ok(value),
                Some(value) => Err(ConfigError::InvalidUrl { var, value }),
                None => Ok(default.to_string()),
            }
        };

        Ok(Self {
            api: resolve("DECK_API_URL", api, &["http://", "https://"])?,
            app: resolve("DECK_APP_URL", app, &["http://", "https://"])?,
            ws: resolve("DECK_WS_URL", ws, &["ws://", "wss://"])?,
        })
    }

    /// Full URL of a backend path such as `api/v1/decks`.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Browser URL that signs in and hands the token to `channel`.
    pub fn login_url(&self, channel: &str) -> String {
        format!(
            "{}/beta-login?intermediate_token={}",
            self.app.trim_end_matches('/'),
            channel
        )
    }

    /// Browser URL of a deck screen.
    pub fn deck_url(&self, username: &str, short_uuid: &str, slug: &str, screen: Screen) -> String {
        format!(
            "{}/users/{}/decks/{}/{}/{}",
            self.app.trim_end_matches('/'),
            username,
            short_uuid,
            slug,
            screen
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an unsupported URL scheme: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_production_defaults() {
        let endpoints = Endpoints::from_lookup(lookup(&[])).unwrap();
        assert_eq!(endpoints.api, API_URL);
        assert_eq!(endpoints.app, APP_URL);
        assert_eq!(endpoints.ws, WS_URL);
    }

    #[test]
    fn test_dev_mode_uses_localhost() {
        let endpoints = Endpoints::from_lookup(lookup(&[("DEV_MODE", "1")])).unwrap();
        assert_eq!(endpoints.api, "http://localhost:3001");
        assert_eq!(endpoints.ws, "ws://localhost:8080/");

        // An empty DEV_MODE counts as unset
        let endpoints = Endpoints::from_lookup(lookup(&[("DEV_MODE", "")])).unwrap();
        assert_eq!(endpoints.api, API_URL);
    }

    #[test]
    fn test_overrides_win_over_mode() {
        let endpoints = Endpoints::from_lookup(lookup(&[
            ("DEV_MODE", "1"),
            ("DECK_API_URL", "https://staging.example"),
            ("DECK_WS_URL", "wss://ws.staging.example/"),
        ]))
        .unwrap();
        assert_eq!(endpoints.api, "https://staging.example");
        assert_eq!(endpoints.app, "http://localhost:3000");
        assert_eq!(endpoints.ws, "wss://ws.staging.example/");
    }

    #[test]
    fn test_rejects_wrong_scheme() {
        let result = Endpoints::from_lookup(lookup(&[("DECK_WS_URL", "https://ws.example")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidUrl { var: "DECK_WS_URL", .. })
        ));
    }

    #[test]
    fn test_urls() {
        let endpoints = Endpoints::from_lookup(lookup(&[("DECK_API_URL", "http://api.test/")])).unwrap();
        assert_eq!(endpoints.api_url("/api/v1/decks"), "http://api.test/api/v1/decks");
        assert_eq!(
            endpoints.login_url("chan"),
            "https://app.ultradeck.co/beta-login?intermediate_token=chan"
        );
        assert_eq!(
            endpoints.deck_url("ann", "abcde", "my-talk", Screen::Present),
            "https://app.ultradeck.co/users/ann/decks/abcde/my-talk/present"
        );
    }
}
