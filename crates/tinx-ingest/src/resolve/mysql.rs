//! Protein resolver backed by the TCRD MySQL warehouse

use super::ProteinResolver;
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tinx_common::types::ProteinId;
use tinx_common::Result;
use tracing::info;

pub struct MySqlResolver {
    db: MySqlPool,
}

impl MySqlResolver {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let db = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "Connected to TCRD database");
        Ok(Self::new(db))
    }
}

#[async_trait]
impl ProteinResolver for MySqlResolver {
    async fn resolve_by_primary_key(&self, source_id: &str) -> Result<Vec<ProteinId>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM protein WHERE stringid = ?")
            .bind(source_id)
            .fetch_all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn resolve_by_secondary_xref(&self, xtype: &str, value: &str) -> Result<Vec<ProteinId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT protein_id FROM xref WHERE xtype = ? AND value = ? AND protein_id IS NOT NULL",
        )
        .bind(xtype)
        .bind(value)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    async fn uniprot_accession(&self, protein_id: ProteinId) -> Result<Option<String>> {
        let accession = sqlx::query_scalar::<_, String>("SELECT uniprot FROM protein WHERE id = ?")
            .bind(protein_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(accession)
    }
}
