use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SpotFilter, SpotStore, StoreError};
use crate::models::{Spot, SpotPatch};

/// In-process spot store, used for development and tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    spots: Arc<RwLock<HashMap<Uuid, Spot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.spots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.spots.read().await.is_empty()
    }
}

#[async_trait]
impl SpotStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, spot: Spot) -> Result<Spot, StoreError> {
        let mut spots = self.spots.write().await;
        spots.insert(spot.id, spot.clone());
        Ok(spot)
    }

    async fn find(&self, filter: SpotFilter) -> Result<Vec<Spot>, StoreError> {
        let spots = self.spots.read().await;
        let mut found: Vec<Spot> = spots.values().filter(|s| filter.matches(s)).cloned().collect();
        found.sort_by_key(|s| (s.created_at, s.id));
        Ok(found)
    }

    async fn find_one(&self, filter: SpotFilter) -> Result<Option<Spot>, StoreError> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    async fn update(&self, id: Uuid, patch: SpotPatch) -> Result<Spot, StoreError> {
        let mut spots = self.spots.write().await;
        let spot = spots
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Spot {} not found", id)))?;
        spot.apply(patch);
        Ok(spot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut spots = self.spots.write().await;
        spots
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Spot {} not found", id)))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
