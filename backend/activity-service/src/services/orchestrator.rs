use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::indices::{IndexCatalog, IndexCategory};
use crate::models::{parse_user_id, ClientRecord};
use crate::repository::ActivityRepository;
use crate::services::aggregator::ActionAggregator;
use crate::services::classifier::is_inactive;
use crate::services::lookup::ActionLookup;
use crate::services::synthesizer::{build_client_record, format_date, SynthesisInput};

/// Actions fetched per user to decide inactivity.
const ANCHOR_ACTIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Inactive,
    Orphan,
    RegisteredNoActions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub inactive_users: Vec<ClientRecord>,
    pub orphan_users: Vec<ClientRecord>,
    pub registered_no_actions: Vec<ClientRecord>,
}

impl BatchOutcome {
    pub fn push(&mut self, bucket: Bucket, record: ClientRecord) {
        match bucket {
            Bucket::Inactive => self.inactive_users.push(record),
            Bucket::Orphan => self.orphan_users.push(record),
            Bucket::RegisteredNoActions => self.registered_no_actions.push(record),
        }
    }

    pub fn total(&self) -> usize {
        self.inactive_users.len() + self.orphan_users.len() + self.registered_no_actions.len()
    }
}

/// Runs the per-user classification pipeline over a page of user ids.
#[derive(Clone)]
pub struct BatchOrchestrator {
    repository: ActivityRepository,
    aggregator: ActionAggregator,
    batch_timeout: Option<Duration>,
}

impl BatchOrchestrator {
    pub fn new(repository: ActivityRepository, catalog: Arc<IndexCatalog>) -> Self {
        let lookup = ActionLookup::new(repository.clone());
        Self {
            aggregator: ActionAggregator::new(lookup, catalog),
            repository,
            batch_timeout: None,
        }
    }

    /// Users still running when the deadline passes are abandoned.
    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = Some(batch_timeout);
        self
    }

    pub fn aggregator(&self) -> &ActionAggregator {
        &self.aggregator
    }

    /// Classifies every user concurrently and waits for all of them.
    ///
    /// Per-user failures only drop that user. Buckets keep the order of `user_ids`.
    pub async fn classify(&self, user_ids: &[String], country_id: i64, months: u32) -> BatchOutcome {
        let now = Utc::now().timestamp();
        let deadline = self.batch_timeout.map(|limit| Instant::now() + limit);

        let mut tasks = JoinSet::new();
        for (position, user_id) in user_ids.iter().enumerate() {
            let orchestrator = self.clone();
            let user_id = user_id.clone();
            tasks.spawn(async move {
                let classified = orchestrator
                    .classify_user(&user_id, country_id, months, now)
                    .await;
                (position, classified)
            });
        }

        let mut classified = Vec::with_capacity(user_ids.len());
        loop {
            let joined = match deadline {
                Some(deadline) => match timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            pending = tasks.len(),
                            "batch deadline exceeded, abandoning remaining users"
                        );
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            match joined {
                None => break,
                Some(Ok((position, Some(result)))) => classified.push((position, result)),
                Some(Ok((_, None))) => {}
                Some(Err(err)) => warn!(error = %err, "user classification task failed"),
            }
        }

        classified.sort_by_key(|(position, _)| *position);

        let mut outcome = BatchOutcome::default();
        for (_, (bucket, record)) in classified {
            outcome.push(bucket, record);
        }

        info!(
            users = user_ids.len(),
            inactive = outcome.inactive_users.len(),
            orphan = outcome.orphan_users.len(),
            registered_no_actions = outcome.registered_no_actions.len(),
            months,
            "processed user batch"
        );
        outcome
    }

    /// Bucket and record for one user, `None` when the user lands in no bucket.
    pub async fn classify_user(
        &self,
        raw_user_id: &str,
        country_id: i64,
        months: u32,
        now: i64,
    ) -> Option<(Bucket, ClientRecord)> {
        let user_id = match parse_user_id(raw_user_id) {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!(error = %err, "skipping user");
                return None;
            }
        };

        let actions = self
            .aggregator
            .last_n_actions(user_id, country_id, ANCHOR_ACTIONS)
            .await;

        if actions.is_empty() {
            let profile = match self.repository.profile(user_id).await {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    warn!(user_id, "registered user not found and no actions");
                    return None;
                }
                Err(err) => {
                    warn!(user_id, error = %err, "profile lookup failed");
                    return None;
                }
            };

            let record = build_client_record(&SynthesisInput {
                user_id: raw_user_id,
                profile: Some(&profile),
                top_up: None,
                bet: None,
                withdrawal: None,
                fallback_country_id: country_id,
                inactivity_months: None,
                anchor_actions: &actions,
                now,
            });
            return Some((Bucket::RegisteredNoActions, record));
        }

        let inactive = is_inactive(&actions, months, now);
        debug!(user_id, actions = actions.len(), inactive, months, "classified user activity");
        if !inactive {
            return None;
        }

        let (profile, top_up, bet, withdrawal) = tokio::join!(
            self.repository.profile(user_id),
            self.aggregator
                .last_from_category(user_id, IndexCategory::TopUp, country_id),
            self.aggregator
                .last_from_category(user_id, IndexCategory::Bet, country_id),
            self.aggregator
                .last_from_category(user_id, IndexCategory::Withdrawal, country_id),
        );

        let profile = match profile {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user_id, error = %err, "profile lookup failed");
                return None;
            }
        };

        let bucket = if profile.is_some() {
            Bucket::Inactive
        } else {
            info!(user_id, "orphan user, actions without client data");
            Bucket::Orphan
        };

        let record = build_client_record(&SynthesisInput {
            user_id: raw_user_id,
            profile: profile.as_ref(),
            top_up: top_up.as_ref(),
            bet: bet.as_ref(),
            withdrawal: withdrawal.as_ref(),
            fallback_country_id: country_id,
            // A zero-month window carries no reactivation threshold.
            inactivity_months: (bucket == Bucket::Inactive && months > 0).then_some(months),
            anchor_actions: &actions,
            now,
        });

        if bucket == Bucket::Inactive && record.reactivation_threshold > 0 {
            info!(
                user_id,
                last_activity = %format_date(record.last_activity),
                reactivation_threshold = %format_date(record.reactivation_threshold),
                months,
                "user became inactive"
            );
        }

        Some((bucket, record))
    }
}
