//! Activity id mapping API.

use super::validate_id;
use crate::client::WhoopClient;
use crate::error::Result;
use crate::types::ActivityIdMapping;

/// Activity mapping API client.
pub struct ActivityApi {
    client: WhoopClient,
}

impl ActivityApi {
    pub(crate) fn new(client: WhoopClient) -> Self {
        Self { client }
    }

    /// Translate a legacy V1 activity id to its V2 UUID.
    pub async fn mapping(&self, activity_v1_id: i64) -> Result<ActivityIdMapping> {
        validate_id("activity V1", activity_v1_id)?;
        self.client
            .get(&format!("v1/activity-mapping/{}", activity_v1_id))
            .await
    }
}
