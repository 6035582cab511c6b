//! Document storage for spots.
//!
//! Every lookup goes through a [`SpotFilter`], which always carries the
//! caller's id. A spot owned by someone else is therefore indistinguishable
//! from one that does not exist.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Spot, SpotPatch};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgSpotStore;

/// Errors from a spot store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Owner-scoped selection predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotFilter {
    pub owner: Uuid,
    pub id: Option<Uuid>,
}

impl SpotFilter {
    /// All spots belonging to `owner`
    pub fn owned_by(owner: Uuid) -> Self {
        Self { owner, id: None }
    }

    /// The spot `id`, only if it belongs to `owner`
    pub fn one(id: Uuid, owner: Uuid) -> Self {
        Self { owner, id: Some(id) }
    }

    pub fn matches(&self, spot: &Spot) -> bool {
        spot.owner == self.owner && self.id.map_or(true, |id| spot.id == id)
    }
}

#[async_trait]
pub trait SpotStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    async fn insert(&self, spot: Spot) -> Result<Spot, StoreError>;

    /// All matching spots, oldest first
    async fn find(&self, filter: SpotFilter) -> Result<Vec<Spot>, StoreError>;

    async fn find_one(&self, filter: SpotFilter) -> Result<Option<Spot>, StoreError>;

    /// Apply `patch` to the spot `id` and return the stored result
    async fn update(&self, id: Uuid, patch: SpotPatch) -> Result<Spot, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Like `find_one`, but a miss becomes `StoreError::NotFound`
    async fn find_404(&self, filter: SpotFilter) -> Result<Spot, StoreError> {
        match self.find_one(filter).await? {
            Some(spot) => Ok(spot),
            None => Err(StoreError::NotFound("Spot not found".to_string())),
        }
    }
}
