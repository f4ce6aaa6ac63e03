//! Workouts API.

use super::{CollectionQuery, validate_uuid};
use crate::client::WhoopClient;
use crate::error::Result;
use crate::types::{Workout, WorkoutCollection};

/// Workouts API client.
pub struct WorkoutsApi {
    client: WhoopClient,
}

impl WorkoutsApi {
    pub(crate) fn new(client: WhoopClient) -> Self {
        Self { client }
    }

    /// List workouts.
    pub async fn list(&self, query: &CollectionQuery) -> Result<WorkoutCollection> {
        self.client.get_with_query("v2/activity/workout", query).await
    }

    /// Get a workout by UUID.
    pub async fn get(&self, workout_id: &str) -> Result<Workout> {
        validate_uuid("workout", workout_id)?;
        self.client
            .get(&format!("v2/activity/workout/{}", workout_id))
            .await
    }
}
