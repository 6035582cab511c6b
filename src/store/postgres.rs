use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{SpotFilter, SpotStore, StoreError};
use crate::config::DatabaseConfig;
use crate::models::{Spot, SpotPatch};

const SPOT_COLUMNS: &str = "id, name, seen, location, notes, owner, created_at, updated_at";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS spots (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL CHECK (name <> ''),
        seen        BOOLEAN NOT NULL DEFAULT FALSE,
        location    TEXT NOT NULL CHECK (location <> ''),
        notes       TEXT NOT NULL CHECK (notes <> ''),
        owner       UUID NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
"#;

const CREATE_OWNER_INDEX: &str = "CREATE INDEX IF NOT EXISTS spots_owner_idx ON spots (owner, created_at)";

/// PostgreSQL-backed spot store
#[derive(Clone)]
pub struct PgSpotStore {
    pool: PgPool,
}

impl PgSpotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `config` and make sure the `spots` table exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self::new(pool);
        store.migrate().await?;
        info!("Connected spot store to PostgreSQL (max_connections={})", config.max_connections);
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_OWNER_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SpotStore for PgSpotStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, spot: Spot) -> Result<Spot, StoreError> {
        let sql = format!(
            "INSERT INTO spots ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {cols}",
            cols = SPOT_COLUMNS
        );
        let stored = sqlx::query_as::<_, Spot>(&sql)
            .bind(spot.id)
            .bind(&spot.name)
            .bind(spot.seen)
            .bind(&spot.location)
            .bind(&spot.notes)
            .bind(spot.owner)
            .bind(spot.created_at)
            .bind(spot.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn find(&self, filter: SpotFilter) -> Result<Vec<Spot>, StoreError> {
        let sql = format!(
            "SELECT {} FROM spots WHERE owner = $1 AND ($2::uuid IS NULL OR id = $2) ORDER BY created_at, id",
            SPOT_COLUMNS
        );
        let spots = sqlx::query_as::<_, Spot>(&sql)
            .bind(filter.owner)
            .bind(filter.id)
            .fetch_all(&self.pool)
            .await?;
        Ok(spots)
    }

    async fn find_one(&self, filter: SpotFilter) -> Result<Option<Spot>, StoreError> {
        let sql = format!(
            "SELECT {} FROM spots WHERE owner = $1 AND ($2::uuid IS NULL OR id = $2) ORDER BY created_at, id LIMIT 1",
            SPOT_COLUMNS
        );
        let spot = sqlx::query_as::<_, Spot>(&sql)
            .bind(filter.owner)
            .bind(filter.id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(spot)
    }

    async fn update(&self, id: Uuid, patch: SpotPatch) -> Result<Spot, StoreError> {
        let sql = format!(
            r#"
            UPDATE spots SET
                name = COALESCE($2, name),
                seen = COALESCE($3, seen),
                location = COALESCE($4, location),
                notes = COALESCE($5, notes),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SPOT_COLUMNS
        );
        sqlx::query_as::<_, Spot>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.seen)
            .bind(patch.location)
            .bind(patch.notes)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Spot {} not found", id)))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM spots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Spot {} not found", id)));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpotDraft;

    /// Connect to the database named by `DATABASE_URL` (or `.env`), if any
    async fn test_store() -> Option<PgSpotStore> {
        let _ = dotenvy::dotenv();
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                eprintln!("DATABASE_URL not set; skipping PostgreSQL store test");
                return None;
            }
        };

        let config = DatabaseConfig {
            url: Some(url),
            max_connections: 2,
            connection_timeout: 5,
        };
        Some(PgSpotStore::connect(&config).await.expect("connect to DATABASE_URL"))
    }

    fn spot_for(owner: Uuid, name: &str) -> Spot {
        Spot::new(
            SpotDraft {
                name: name.to_string(),
                seen: false,
                location: "Main St".to_string(),
                notes: "good coffee".to_string(),
            },
            owner,
        )
    }

    #[tokio::test]
    async fn insert_returns_stored_row() {
        let Some(store) = test_store().await else { return };
        // Running the table setup twice is harmless
        store.migrate().await.unwrap();
        store.health_check().await.unwrap();

        let spot = spot_for(Uuid::new_v4(), "Cafe");
        let stored = store.insert(spot.clone()).await.unwrap();
        assert_eq!(stored.id, spot.id);
        assert_eq!(stored.owner, spot.owner);
        assert_eq!(stored.name, "Cafe");
        assert!(!stored.seen);

        store.delete(stored.id).await.unwrap();
    }

    #[tokio::test]
    async fn find_is_scoped_to_owner() {
        let Some(store) = test_store().await else { return };
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let a1 = store.insert(spot_for(alice, "a1")).await.unwrap();
        let a2 = store.insert(spot_for(alice, "a2")).await.unwrap();
        let b1 = store.insert(spot_for(bob, "b1")).await.unwrap();

        let found = store.find(SpotFilter::owned_by(alice)).await.unwrap();
        let ids: Vec<Uuid> = found.iter().map(|s| s.id).collect();
        assert_eq!(found.len(), 2);
        assert!(ids.contains(&a1.id) && ids.contains(&a2.id));
        assert!(found.iter().all(|s| s.owner == alice));

        let found = store.find(SpotFilter::owned_by(bob)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, b1.id);

        // Someone else's id looks exactly like a missing one
        assert!(store.find_one(SpotFilter::one(b1.id, alice)).await.unwrap().is_none());
        assert!(store.find_one(SpotFilter::one(Uuid::new_v4(), alice)).await.unwrap().is_none());
        assert_eq!(store.find_one(SpotFilter::one(b1.id, bob)).await.unwrap().map(|s| s.id), Some(b1.id));

        for id in [a1.id, a2.id, b1.id] {
            store.delete(id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn partial_update_keeps_untouched_fields_and_owner() {
        let Some(store) = test_store().await else { return };
        let owner = Uuid::new_v4();
        let spot = store.insert(spot_for(owner, "Cafe")).await.unwrap();

        let updated = store
            .update(spot.id, SpotPatch { seen: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert!(updated.seen);
        assert_eq!(updated.name, "Cafe");
        assert_eq!(updated.location, "Main St");
        assert_eq!(updated.notes, "good coffee");
        assert_eq!(updated.owner, owner);

        let reread = store.find_404(SpotFilter::one(spot.id, owner)).await.unwrap();
        assert_eq!(reread, updated);

        store.delete(spot.id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let Some(store) = test_store().await else { return };
        let owner = Uuid::new_v4();
        let spot = store.insert(spot_for(owner, "Cafe")).await.unwrap();

        store.delete(spot.id).await.unwrap();
        assert!(matches!(store.delete(spot.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update(spot.id, SpotPatch::default()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.find_one(SpotFilter::one(spot.id, owner)).await.unwrap().is_none());
    }
}
