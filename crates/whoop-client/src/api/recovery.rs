//! Recovery API.

use super::CollectionQuery;
use crate::client::WhoopClient;
use crate::error::Result;
use crate::types::RecoveryCollection;

/// Recovery API client. Single recoveries are looked up by cycle, see
/// [`crate::api::CyclesApi::recovery`].
pub struct RecoveryApi {
    client: WhoopClient,
}

impl RecoveryApi {
    pub(crate) fn new(client: WhoopClient) -> Self {
        Self { client }
    }

    /// List recovery records.
    pub async fn list(&self, query: &CollectionQuery) -> Result<RecoveryCollection> {
        self.client.get_with_query("v2/recovery", query).await
    }
}
