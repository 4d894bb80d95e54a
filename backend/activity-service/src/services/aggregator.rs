use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::indices::{IndexCatalog, IndexCategory};
use crate::models::ActionRecord;
use crate::services::lookup::ActionLookup;

/// Fans action lookups out over every tracked index and merges the answers.
#[derive(Clone)]
pub struct ActionAggregator {
    lookup: ActionLookup,
    catalog: Arc<IndexCatalog>,
}

impl ActionAggregator {
    pub fn new(lookup: ActionLookup, catalog: Arc<IndexCatalog>) -> Self {
        Self { lookup, catalog }
    }

    /// Up to `n` most recent actions of `user_id` across all indices.
    ///
    /// One task per index; returns only after every task has finished.
    pub async fn last_n_actions(&self, user_id: i64, country_id: i64, n: usize) -> Vec<ActionRecord> {
        if n == 0 {
            return Vec::new();
        }

        let handles: Vec<_> = self
            .catalog
            .all()
            .iter()
            .cloned()
            .map(|spec| {
                let lookup = self.lookup.clone();
                tokio::spawn(async move { lookup.lookup(&spec, user_id, country_id, n).await })
            })
            .collect();

        let mut merged = Vec::new();
        for (spec, joined) in self.catalog.all().iter().zip(join_all(handles).await) {
            match joined {
                Ok(actions) => merged.extend(actions),
                Err(err) => warn!(index = %spec.name, user_id, error = %err, "index lookup task failed"),
            }
        }

        merge_most_recent(merged, n)
    }

    /// Most recent action of `user_id` among the indices of one category.
    pub async fn last_from_category(
        &self,
        user_id: i64,
        category: IndexCategory,
        country_id: i64,
    ) -> Option<ActionRecord> {
        let lookups = self
            .catalog
            .category(category)
            .map(|spec| self.lookup.lookup(spec, user_id, country_id, 1));

        let candidates = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|actions| actions.into_iter().next());

        let best = pick_latest(candidates);
        debug!(
            user_id,
            category = category.as_str(),
            created_at = best.as_ref().map(ActionRecord::created_at),
            "category lookup completed"
        );
        best
    }
}

/// Sorts newest-first and keeps `n`. Ties keep their input order.
pub fn merge_most_recent(mut actions: Vec<ActionRecord>, n: usize) -> Vec<ActionRecord> {
    actions.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    actions.truncate(n);
    actions
}

/// Record with the strictly largest nonzero timestamp; the first one wins a tie.
pub fn pick_latest(candidates: impl IntoIterator<Item = ActionRecord>) -> Option<ActionRecord> {
    candidates
        .into_iter()
        .fold(None, |best: Option<ActionRecord>, candidate| {
            let best_ts = best.as_ref().map_or(0, ActionRecord::created_at);
            if candidate.created_at() > best_ts {
                Some(candidate)
            } else {
                best
            }
        })
}
