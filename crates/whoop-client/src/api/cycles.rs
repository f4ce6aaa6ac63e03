//! Cycles API.

use super::{CollectionQuery, validate_id};
use crate::client::WhoopClient;
use crate::error::Result;
use crate::types::{Cycle, CycleCollection, Recovery, Sleep};

/// Cycles API client.
pub struct CyclesApi {
    client: WhoopClient,
}

impl CyclesApi {
    pub(crate) fn new(client: WhoopClient) -> Self {
        Self { client }
    }

    /// List cycles, newest first.
    pub async fn list(&self, query: &CollectionQuery) -> Result<CycleCollection> {
        self.client.get_with_query("v2/cycle", query).await
    }

    /// Get a cycle by ID.
    pub async fn get(&self, cycle_id: i64) -> Result<Cycle> {
        validate_id("cycle", cycle_id)?;
        self.client.get(&format!("v2/cycle/{}", cycle_id)).await
    }

    /// The sleep that ended this cycle.
    pub async fn sleep(&self, cycle_id: i64) -> Result<Sleep> {
        validate_id("cycle", cycle_id)?;
        self.client.get(&format!("v2/cycle/{}/sleep", cycle_id)).await
    }

    /// The recovery scored for this cycle.
    pub async fn recovery(&self, cycle_id: i64) -> Result<Recovery> {
        validate_id("cycle", cycle_id)?;
        self.client
            .get(&format!("v2/cycle/{}/recovery", cycle_id))
            .await
    }
}
