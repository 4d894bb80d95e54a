use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::gateway::{SearchError, SearchGateway};
use crate::models::{render_number, ActionRecord, UserProfile};
use crate::query::{self, SearchRequest};

/// Typed reads over the search gateway.
#[derive(Clone)]
pub struct ActivityRepository {
    gateway: Arc<dyn SearchGateway>,
    clients_index: String,
}

impl ActivityRepository {
    pub fn new(gateway: Arc<dyn SearchGateway>, clients_index: &str) -> Self {
        Self {
            gateway,
            clients_index: clients_index.to_string(),
        }
    }

    /// One page of user ids from the clients index.
    pub async fn user_ids(
        &self,
        from: usize,
        size: usize,
        country_id: i64,
    ) -> Result<Vec<String>, SearchError> {
        let request = query::user_ids_query(&self.clients_index, from, size, country_id);
        let hits = self.gateway.search(&request).await?;

        Ok(hits
            .iter()
            .filter_map(|hit| {
                hit.source
                    .get("stats")
                    .and_then(Value::as_object)
                    .and_then(|stats| stats.get("userId"))
                    .and_then(render_number)
            })
            .collect())
    }

    /// Profile document for `user_id`, `None` when the user has none.
    pub async fn profile(&self, user_id: i64) -> Result<Option<UserProfile>, SearchError> {
        let request = query::profile_query(&self.clients_index, user_id);
        let hits = self.gateway.search(&request).await?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let profile = UserProfile::from_document(&hit.source);
        if profile.created_at.is_none() {
            warn!(user_id, "user document missing createdAt");
        }
        Ok(Some(profile))
    }

    pub async fn actions(&self, request: &SearchRequest) -> Result<Vec<ActionRecord>, SearchError> {
        let hits = self.gateway.search(request).await?;
        debug!(index = %request.index, hits = hits.len(), "action search completed");

        Ok(hits
            .into_iter()
            .map(|hit| {
                // Hits from aliases report the concrete index.
                let index = if hit.index.is_empty() {
                    request.index.clone()
                } else {
                    hit.index
                };
                ActionRecord::new(index, hit.source)
            })
            .collect())
    }
}
