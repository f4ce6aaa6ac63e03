//! Sleep API.

use super::{CollectionQuery, validate_uuid};
use crate::client::WhoopClient;
use crate::error::Result;
use crate::types::{Sleep, SleepCollection};

/// Sleep API client.
pub struct SleepApi {
    client: WhoopClient,
}

impl SleepApi {
    pub(crate) fn new(client: WhoopClient) -> Self {
        Self { client }
    }

    /// List sleep records, including naps.
    pub async fn list(&self, query: &CollectionQuery) -> Result<SleepCollection> {
        self.client.get_with_query("v2/activity/sleep", query).await
    }

    /// Get a sleep record by UUID.
    pub async fn get(&self, sleep_id: &str) -> Result<Sleep> {
        validate_uuid("sleep", sleep_id)?;
        self.client
            .get(&format!("v2/activity/sleep/{}", sleep_id))
            .await
    }
}
