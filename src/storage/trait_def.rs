use crate::campaign::CampaignField;
use crate::models::{StoredCampaign, VisitorInfo};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("visit log query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("invalid table prefix '{0}'")]
    InvalidIdentifier(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which end of a visitor's history to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Oldest visit first
    Ascending,
    /// Most recent visit first
    Descending,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create the visit log table, etc.)
    async fn init(&self) -> Result<()>;

    /// Insert a visit row and return its id
    ///
    /// Only used to seed the visit log; the tracker owns visit persistence.
    async fn insert_visit(&self, visit: &VisitorInfo) -> StorageResult<i64>;

    /// Campaign columns of one visit by `idvisitor` with at least one campaign column set
    ///
    /// Visits are ordered by `idvisit` in `direction`; the first row wins.
    async fn fetch_visitor_campaign(
        &self,
        idvisitor: &[u8],
        direction: SortDirection,
    ) -> StorageResult<Option<StoredCampaign>>;
}

/// Validate a table prefix before it is spliced into SQL
pub(crate) fn validate_table_prefix(prefix: &str) -> StorageResult<()> {
    if prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier(prefix.to_string()))
    }
}

/// `SELECT` for the visitor campaign lookup; `placeholder` is the backend's bind marker
pub(crate) fn visitor_campaign_query(
    table: &str,
    placeholder: &str,
    direction: SortDirection,
) -> String {
    let columns: Vec<&str> = CampaignField::ALL
        .iter()
        .map(|field| field.column_name())
        .collect();
    let any_set: Vec<String> = columns
        .iter()
        .map(|column| format!("{column} IS NOT NULL"))
        .collect();

    format!(
        "SELECT {} FROM {} WHERE idvisitor = {} AND ({}) ORDER BY idvisit {} LIMIT 1",
        columns.join(", "),
        table,
        placeholder,
        any_set.join(" OR "),
        direction.as_sql()
    )
}

/// `INSERT` column list shared by the backends, campaign columns in field order
pub(crate) fn campaign_columns() -> String {
    CampaignField::ALL
        .iter()
        .map(|field| field.column_name())
        .collect::<Vec<_>>()
        .join(", ")
}
