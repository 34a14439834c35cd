use crate::models::{StoredCampaign, VisitorInfo};
use crate::storage::trait_def::{
    campaign_columns, validate_table_prefix, visitor_campaign_query,
};
use crate::storage::{SortDirection, Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    table: String,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        Self::with_prefix(database_url, max_connections, "").await
    }

    pub async fn with_prefix(
        database_url: &str,
        max_connections: u32,
        table_prefix: &str,
    ) -> Result<Self> {
        validate_table_prefix(table_prefix)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            table: format!("{table_prefix}log_visit"),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                idvisit INTEGER PRIMARY KEY AUTOINCREMENT,
                idvisitor BLOB NOT NULL,
                campaign_name TEXT,
                campaign_keyword TEXT,
                campaign_source TEXT,
                campaign_medium TEXT,
                campaign_content TEXT,
                campaign_id TEXT,
                campaign_group TEXT,
                campaign_placement TEXT
            )
            "#,
            self.table
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_idvisitor ON {0}(idvisitor, idvisit)",
            self.table
        ))
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn insert_visit(&self, visit: &VisitorInfo) -> StorageResult<i64> {
        let campaign = &visit.campaign;
        let sql = format!(
            "INSERT INTO {} (idvisitor, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table,
            campaign_columns()
        );

        let result = sqlx::query(&sql)
            .bind(visit.idvisitor.as_slice())
            .bind(campaign.campaign_name.as_deref())
            .bind(campaign.campaign_keyword.as_deref())
            .bind(campaign.campaign_source.as_deref())
            .bind(campaign.campaign_medium.as_deref())
            .bind(campaign.campaign_content.as_deref())
            .bind(campaign.campaign_id.as_deref())
            .bind(campaign.campaign_group.as_deref())
            .bind(campaign.campaign_placement.as_deref())
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn fetch_visitor_campaign(
        &self,
        idvisitor: &[u8],
        direction: SortDirection,
    ) -> StorageResult<Option<StoredCampaign>> {
        let sql = visitor_campaign_query(&self.table, "?", direction);
        debug!(%sql, "looking up visitor campaign");

        let row = sqlx::query_as::<_, StoredCampaign>(&sql)
            .bind(idvisitor)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row)
    }
}
