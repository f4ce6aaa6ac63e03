//! User API.

use crate::client::WhoopClient;
use crate::error::Result;
use crate::types::{UserBasicProfile, UserBodyMeasurement};

/// User API client.
pub struct UserApi {
    client: WhoopClient,
}

impl UserApi {
    pub(crate) fn new(client: WhoopClient) -> Self {
        Self { client }
    }

    /// Basic profile: name and email.
    pub async fn profile(&self) -> Result<UserBasicProfile> {
        self.client.get("v2/user/profile/basic").await
    }

    /// Height, weight and max heart rate.
    pub async fn body_measurements(&self) -> Result<UserBodyMeasurement> {
        self.client.get("v2/user/measurement/body").await
    }
}
