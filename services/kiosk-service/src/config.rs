use std::str::FromStr;

use kiosk_common::{env_or, env_string};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid DATABASE_URL: {0}")]
    DatabaseUrl(#[source] tokio_postgres::Error),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub database: DatabaseConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 3000u16),
            database: DatabaseConfig::from_env(),
        }
    }
}

/// Where the interaction store lives. A full URL wins over the discrete `DB_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Url(String),
    Params {
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        dbname: String,
    },
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        if let Some(url) = env_string("DATABASE_URL") {
            return Self::Url(url);
        }
        Self::Params {
            host: env_string("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: env_or("DB_PORT", 5432u16),
            user: env_string("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: env_string("DB_PASSWORD"),
            dbname: env_string("DB_NAME").unwrap_or_else(|| "kiosk".to_string()),
        }
    }

    pub fn to_pg_config(&self) -> Result<tokio_postgres::Config, ConfigError> {
        match self {
            Self::Url(url) => tokio_postgres::Config::from_str(url).map_err(ConfigError::DatabaseUrl),
            Self::Params {
                host,
                port,
                user,
                password,
                dbname,
            } => {
                let mut config = tokio_postgres::Config::new();
                config.host(host).port(*port).user(user).dbname(dbname);
                if let Some(password) = password {
                    config.password(password);
                }
                Ok(config)
            }
        }
    }

    /// Connection target without credentials, for startup logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Url(_) => "DATABASE_URL".to_string(),
            Self::Params {
                host, port, dbname, ..
            } => format!("{host}:{port}/{dbname}"),
        }
    }
}
