use crate::error::FeedError;
use std::env;

pub const USER_VAR: &str = "API_USER";
pub const PASSWORD_VAR: &str = "API_PASSWORD";
pub const URL_VAR: &str = "API_LIVEXY_URL";
const GAME_ID_PLACEHOLDER: &str = "{gameid}";

/// Credentials and endpoint for the LiveXY feed. Built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_user: String,
    pub api_password: String,
    pub livexy_url: String,
}

impl Config {
    pub fn new(api_user: &str, api_password: &str, livexy_url: &str) -> Result<Self, FeedError> {
        let api_user = require(USER_VAR, api_user)?;
        let api_password = require(PASSWORD_VAR, api_password)?;
        let livexy_url = require(URL_VAR, livexy_url)?;

        if !livexy_url.contains(GAME_ID_PLACEHOLDER) {
            return Err(FeedError::ConfigInvalid(format!(
                "{} must contain {}",
                URL_VAR, GAME_ID_PLACEHOLDER
            )));
        }

        Ok(Self {
            api_user,
            api_password,
            livexy_url,
        })
    }

    pub fn from_env() -> Result<Self, FeedError> {
        let var =
            |name: &'static str| env::var(name).map_err(|_| FeedError::ConfigMissing(name));

        Self::new(&var(USER_VAR)?, &var(PASSWORD_VAR)?, &var(URL_VAR)?)
    }

    pub fn url_for(&self, game_id: i64) -> String {
        self.livexy_url
            .replace(GAME_ID_PLACEHOLDER, &game_id.to_string())
    }
}

fn require(name: &'static str, value: &str) -> Result<String, FeedError> {
    if value.trim().is_empty() {
        return Err(FeedError::ConfigMissing(name));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_substitution() {
        let config = Config::new(
            "analyst",
            "secret",
            "https://stats.test/livexy?game={gameid}&fmt=xml",
        )
        .unwrap();

        assert_eq!(
            config.url_for(111_920),
            "https://stats.test/livexy?game=111920&fmt=xml"
        );
    }

    #[test]
    fn test_blank_values_are_missing() {
        let err = Config::new("  ", "secret", "https://stats.test/{gameid}").unwrap_err();
        assert!(matches!(err, FeedError::ConfigMissing(USER_VAR)));
    }

    #[test]
    fn test_blank_password_and_url_are_missing() {
        assert!(matches!(
            Config::new("analyst", "", "https://stats.test/{gameid}"),
            Err(FeedError::ConfigMissing(PASSWORD_VAR))
        ));
        assert!(matches!(
            Config::new("analyst", "secret", " "),
            Err(FeedError::ConfigMissing(URL_VAR))
        ));
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let err = Config::new("analyst", "secret", "https://stats.test/feed").unwrap_err();
        assert!(matches!(err, FeedError::ConfigInvalid(_)));
    }
}
