use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignField, CampaignParameterMap};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub campaign: CampaignConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
    /// Prefix of the visit log table (`{prefix}log_visit`)
    pub table_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Credit the visitor's first campaign touch instead of the latest one
    pub attribute_first_referrer: bool,
    pub parameters: CampaignParameterMap,
}

impl DatabaseConfig {
    const fn default_max_connections() -> u32 {
        5
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_str = lookup("DATABASE_BACKEND").unwrap_or_else(|| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://./campaigns.db".to_string());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => DatabaseConfig::default_max_connections(),
        };

        let table_prefix = lookup("TABLE_PREFIX").unwrap_or_default();
        if !table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            anyhow::bail!("TABLE_PREFIX may only contain ASCII letters, digits and '_'");
        }

        let attribute_first_referrer = lookup("ATTRIBUTE_FIRST_REFERRER")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let mut parameters = CampaignParameterMap::default();
        for field in CampaignField::ALL {
            let key = format!("CAMPAIGN_{}_PARAMETERS", field.as_str().to_uppercase());
            if let Some(value) = lookup(&key) {
                let aliases: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|alias| !alias.is_empty())
                    .map(str::to_string)
                    .collect();
                if aliases.is_empty() {
                    tracing::warn!("{key} is empty, {field} will never be detected from urls");
                }
                parameters.set(field, aliases);
            }
        }

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
                table_prefix,
            },
            campaign: CampaignConfig {
                attribute_first_referrer,
                parameters,
            },
        })
    }
}
