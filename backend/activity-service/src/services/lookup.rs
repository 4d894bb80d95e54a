use tracing::{debug, warn};

use crate::gateway::SearchError;
use crate::indices::IndexSpec;
use crate::models::ActionRecord;
use crate::query::{self, SearchRequest};
use crate::repository::ActivityRepository;

/// Ways of looking up a user's actions in one index, tried in [`LookupStrategy::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Restricted to the requested country.
    CountryScoped,
    /// Any country. Without a requested country it only runs after the
    /// scoped query failed, since an empty answer would just repeat.
    AnyCountry,
}

impl LookupStrategy {
    pub const ORDER: [LookupStrategy; 2] = [LookupStrategy::CountryScoped, LookupStrategy::AnyCountry];

    pub fn applies_to(&self, country_id: i64, previous_failed: bool) -> bool {
        match self {
            LookupStrategy::CountryScoped => true,
            LookupStrategy::AnyCountry => country_id != 0 || previous_failed,
        }
    }

    pub fn request(&self, spec: &IndexSpec, user_id: i64, country_id: i64, size: usize) -> SearchRequest {
        match self {
            LookupStrategy::CountryScoped => query::actions_query(spec, user_id, country_id, size),
            LookupStrategy::AnyCountry => query::actions_query(spec, user_id, 0, size),
        }
    }
}

#[derive(Clone)]
pub struct ActionLookup {
    repository: ActivityRepository,
}

impl ActionLookup {
    pub fn new(repository: ActivityRepository) -> Self {
        Self { repository }
    }

    pub async fn run_strategy(
        &self,
        strategy: LookupStrategy,
        spec: &IndexSpec,
        user_id: i64,
        country_id: i64,
        size: usize,
    ) -> Result<Vec<ActionRecord>, SearchError> {
        let request = strategy.request(spec, user_id, country_id, size);
        self.repository.actions(&request).await
    }

    /// Most recent actions of `user_id` in one index, newest first.
    ///
    /// Strategies are tried until one returns actions. Failures never
    /// propagate: an error from the last strategy tried is logged and the
    /// index counts as having no actions.
    pub async fn lookup(
        &self,
        spec: &IndexSpec,
        user_id: i64,
        country_id: i64,
        size: usize,
    ) -> Vec<ActionRecord> {
        let mut last_error = None;

        for strategy in LookupStrategy::ORDER {
            if !strategy.applies_to(country_id, last_error.is_some()) {
                continue;
            }

            match self
                .run_strategy(strategy, spec, user_id, country_id, size)
                .await
            {
                Ok(actions) if !actions.is_empty() => return actions,
                Ok(_) => last_error = None,
                Err(err) => {
                    debug!(index = %spec.name, user_id, ?strategy, error = %err, "action lookup strategy failed");
                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = last_error {
            warn!(index = %spec.name, user_id, error = %err, "action lookup failed");
        }
        Vec::new()
    }
}
