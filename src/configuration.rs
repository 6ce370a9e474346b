use chrono::Duration;

use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server-level connection, for creating a database
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing and lifetime settings
///
/// The secret is loaded once at startup and handed to the session issuer.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (default 3600)
    pub refresh_token_expiry: i64,  // seconds (default 60 days)
}

impl JwtSettings {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_expiry)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_expiry)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.access_token_expiry must be positive, got {}",
                self.access_token_expiry
            )));
        }
        if self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.refresh_token_expiry must be positive, got {}",
                self.refresh_token_expiry
            )));
        }
        Ok(())
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_expiry: 60 * 60,
            refresh_token_expiry: 60 * 24 * 60 * 60,
        }
    }
}

// Never print the secret.
impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[redacted]")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

/// Load `configuration.yaml` (optional) overlaid with `APP__*` environment variables
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    settings.jwt.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str, access: i64, refresh: i64) -> JwtSettings {
        JwtSettings {
            secret: secret.to_string(),
            access_token_expiry: access,
            refresh_token_expiry: refresh,
        }
    }

    #[test]
    fn test_defaults_are_one_hour_and_sixty_days() {
        let settings = JwtSettings::default();
        assert_eq!(settings.access_token_ttl(), Duration::hours(1));
        assert_eq!(settings.refresh_token_ttl(), Duration::days(60));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            jwt("  ", 3600, 3600).validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_non_positive_ttls_rejected() {
        assert!(jwt("secret", 0, 3600).validate().is_err());
        assert!(jwt("secret", 3600, -1).validate().is_err());
        assert!(jwt("secret", 3600, 3600).validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", jwt("super-secret", 1, 1));
        assert!(!rendered.contains("super-secret"));
    }
}
