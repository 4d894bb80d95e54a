//! Builds the [`ClientRecord`] reported for a classified user.

use chrono::DateTime;
use tracing::{debug, info};

use crate::models::{created_at_of, ActionRecord, ClientRecord, UserProfile};
use crate::services::classifier::SECONDS_PER_MONTH;

/// Currency applied when the request targets a known country.
const COUNTRY_CURRENCIES: [(i64, i64); 3] = [(213, 1), (181, 2), (233, 3)];

/// Currency of profile-less users unless a country override applies.
const ORPHAN_CURRENCY_ID: i64 = 1;

pub fn currency_override(country_id: i64) -> Option<i64> {
    COUNTRY_CURRENCIES
        .iter()
        .find(|(country, _)| *country == country_id)
        .map(|(_, currency)| *currency)
}

/// Everything known about one user when its record is assembled.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub user_id: &'a str,
    pub profile: Option<&'a UserProfile>,
    pub top_up: Option<&'a ActionRecord>,
    pub bet: Option<&'a ActionRecord>,
    pub withdrawal: Option<&'a ActionRecord>,
    /// Country requested by the caller; used for profile-less users and the currency override.
    pub fallback_country_id: i64,
    /// Inactivity window in months; only set for users in the inactive bucket.
    pub inactivity_months: Option<u32>,
    /// Most recent actions across all indices, newest first.
    pub anchor_actions: &'a [ActionRecord],
    pub now: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryTimestamps {
    pub top_up: i64,
    pub bet: i64,
    pub withdrawal: i64,
}

impl CategoryTimestamps {
    pub fn latest(&self) -> i64 {
        self.top_up.max(self.bet).max(self.withdrawal)
    }

    pub fn earliest_nonzero(&self) -> Option<i64> {
        [self.top_up, self.bet, self.withdrawal]
            .into_iter()
            .filter(|ts| *ts > 0)
            .min()
    }

    pub fn is_empty(&self) -> bool {
        self.top_up == 0 && self.bet == 0 && self.withdrawal == 0
    }

    fn latest_kind(&self) -> &'static str {
        let latest = self.latest();
        if latest == 0 {
            "UNKNOWN"
        } else if latest == self.top_up {
            "TOP_UP"
        } else if latest == self.bet {
            "BET"
        } else {
            "WITHDRAWAL"
        }
    }
}

/// Sources of a registration timestamp, tried in [`RegistrationSource::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationSource {
    /// `user.createdAt` of the profile.
    ProfileField,
    /// Earliest nonzero category timestamp.
    EarliestAction,
}

impl RegistrationSource {
    pub const ORDER: [RegistrationSource; 2] = [
        RegistrationSource::ProfileField,
        RegistrationSource::EarliestAction,
    ];

    pub fn resolve(&self, profile: Option<&UserProfile>, timestamps: &CategoryTimestamps) -> Option<i64> {
        match self {
            RegistrationSource::ProfileField => profile
                .and_then(|p| p.created_at)
                .filter(|created_at| *created_at > 0),
            RegistrationSource::EarliestAction => timestamps.earliest_nonzero(),
        }
    }
}

pub fn resolve_registration(
    profile: Option<&UserProfile>,
    timestamps: &CategoryTimestamps,
) -> Option<(i64, RegistrationSource)> {
    RegistrationSource::ORDER
        .into_iter()
        .find_map(|source| source.resolve(profile, timestamps).map(|ts| (ts, source)))
}

pub(crate) fn format_date(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

pub fn build_client_record(input: &SynthesisInput<'_>) -> ClientRecord {
    let timestamps = CategoryTimestamps {
        top_up: created_at_of(input.top_up),
        bet: created_at_of(input.bet),
        withdrawal: created_at_of(input.withdrawal),
    };

    let mut record = ClientRecord::new(input.user_id);
    record.last_top_up = timestamps.top_up;
    record.last_bet = timestamps.bet;
    record.last_withdrawal = timestamps.withdrawal;
    // Zero when all three categories are empty.
    record.last_activity = timestamps.latest();

    if !timestamps.is_empty() {
        debug!(
            user_id = input.user_id,
            last_activity = %format_date(record.last_activity),
            kind = timestamps.latest_kind(),
            top_up = timestamps.top_up,
            bet = timestamps.bet,
            withdrawal = timestamps.withdrawal,
            "resolved last activity"
        );
    } else if let Some(anchor) = input.anchor_actions.first().filter(|a| a.created_at() > 0) {
        // lastActivity only reflects the three categories.
        debug!(
            user_id = input.user_id,
            index = anchor.index(),
            created_at = anchor.created_at(),
            "activity only seen outside the tracked categories, last activity stays 0"
        );
    }

    let registration = resolve_registration(input.profile, &timestamps);

    match input.profile {
        Some(profile) => {
            if let Some((created_at, source)) = registration {
                record.created_at = created_at;
                if source == RegistrationSource::EarliestAction {
                    info!(
                        user_id = input.user_id,
                        created_at, "user missing createdAt, using first action as registration"
                    );
                }
            }

            if let Some(login) = &profile.login {
                record.login = login.clone();
            }
            if let Some(first_name) = &profile.first_name {
                record.first_name = first_name.clone();
            }
            if let Some(last_name) = &profile.last_name {
                record.last_name = last_name.clone();
            }
            if let Some(phone) = &profile.phone {
                record.phone = phone.clone();
            }
            if let Some(country_id) = profile.country_id {
                record.country_id = country_id;
            }
            if let Some(state) = profile.state {
                record.state = state;
            }
            if let Some(platform) = profile.platform {
                record.platform = platform;
            }

            if let Some(wallet) = profile.active_wallet() {
                if let Some(number) = &wallet.number {
                    record.account.active_wallet = number.clone();
                }
                if let Some(balance) = wallet.balance {
                    record.account.balance = balance;
                }
                if let Some(currency_id) = wallet.currency_id {
                    record.account.currency_id = currency_id;
                }
            }
        }
        None => {
            record.country_id = input.fallback_country_id;
            record.platform = 0;
            record.account.currency_id = ORPHAN_CURRENCY_ID;

            if let Some((created_at, _)) = registration {
                record.created_at = created_at;
                info!(
                    user_id = input.user_id,
                    created_at, "orphan user, using first action as registration"
                );
            }
        }
    }

    if let Some(currency_id) = currency_override(input.fallback_country_id) {
        record.account.currency_id = currency_id;
    }

    if let Some(months) = input.inactivity_months {
        if record.last_activity > 0 {
            record.reactivation_threshold =
                record.last_activity - i64::from(months) * SECONDS_PER_MONTH;
            record.can_reactivate = input.now > record.reactivation_threshold;
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Wallet};
    use serde_json::json;

    const NOW: i64 = 1_760_000_000;

    fn action(key: &str, created_at: i64) -> ActionRecord {
        let source = json!({ key: { "createdAt": created_at } });
        ActionRecord::new("idx", source.as_object().cloned().unwrap())
    }

    fn input<'a>(user_id: &'a str, profile: Option<&'a UserProfile>) -> SynthesisInput<'a> {
        SynthesisInput {
            user_id,
            profile,
            top_up: None,
            bet: None,
            withdrawal: None,
            fallback_country_id: 0,
            inactivity_months: None,
            anchor_actions: &[],
            now: NOW,
        }
    }

    #[test]
    fn last_activity_is_max_of_categories() {
        let top_up = action("entity", 100);
        let bet = action("bet", 300);
        let withdrawal = action("withdrawal", 200);
        let profile = UserProfile::default();

        let record = build_client_record(&SynthesisInput {
            top_up: Some(&top_up),
            bet: Some(&bet),
            withdrawal: Some(&withdrawal),
            ..input("1", Some(&profile))
        });

        assert_eq!(record.last_activity, 300);
        assert_eq!(record.last_top_up, 100);
        assert_eq!(record.last_bet, 300);
        assert_eq!(record.last_withdrawal, 200);
    }

    #[test]
    fn synthesis_is_idempotent() {
        let bet = action("bet", 1_700_000_000);
        let profile = UserProfile::default();
        let args = SynthesisInput {
            bet: Some(&bet),
            inactivity_months: Some(1),
            ..input("1", Some(&profile))
        };
        assert_eq!(build_client_record(&args), build_client_record(&args));
    }

    #[test]
    fn activity_outside_categories_leaves_last_activity_zero() {
        let anchors = [action("createdAt", 0), action("bet", 5)];
        let generic = {
            let source = json!({ "createdAt": 1_700_000_000 });
            ActionRecord::new("bonus-activations", source.as_object().cloned().unwrap())
        };
        let anchors_with_generic = [generic];
        let profile = UserProfile::default();

        let record = build_client_record(&SynthesisInput {
            anchor_actions: &anchors_with_generic,
            inactivity_months: Some(1),
            ..input("9", Some(&profile))
        });
        assert_eq!(record.last_activity, 0);
        assert_eq!(record.reactivation_threshold, 0);
        assert!(!record.can_reactivate);
        assert_eq!(record.created_at, 0);

        let record = build_client_record(&SynthesisInput {
            anchor_actions: &anchors,
            ..input("9", None)
        });
        assert_eq!(record.last_activity, 0);
    }

    #[test]
    fn profile_registration_wins_over_inference() {
        let bet = action("bet", 1_700_000_000);
        let profile = UserProfile {
            created_at: Some(1_650_000_000),
            ..UserProfile::default()
        };

        let record = build_client_record(&SynthesisInput {
            bet: Some(&bet),
            ..input("42", Some(&profile))
        });
        assert_eq!(record.created_at, 1_650_000_000);
    }

    #[test]
    fn missing_registration_uses_earliest_nonzero_action() {
        let top_up = action("entity", 500);
        let bet = action("bet", 300);
        let profile = UserProfile {
            created_at: Some(0),
            ..UserProfile::default()
        };

        let record = build_client_record(&SynthesisInput {
            top_up: Some(&top_up),
            bet: Some(&bet),
            ..input("3", Some(&profile))
        });
        assert_eq!(record.created_at, 300);
        assert_eq!(
            resolve_registration(Some(&profile), &CategoryTimestamps { top_up: 500, bet: 300, withdrawal: 0 }),
            Some((300, RegistrationSource::EarliestAction))
        );
    }

    #[test]
    fn registration_sources_resolve_independently() {
        let profile = UserProfile {
            created_at: Some(77),
            ..UserProfile::default()
        };
        let empty = CategoryTimestamps::default();

        assert_eq!(RegistrationSource::ProfileField.resolve(Some(&profile), &empty), Some(77));
        assert_eq!(RegistrationSource::ProfileField.resolve(None, &empty), None);
        assert_eq!(RegistrationSource::EarliestAction.resolve(None, &empty), None);
        assert_eq!(resolve_registration(None, &empty), None);
    }

    #[test]
    fn profile_fields_and_active_wallet_are_copied() {
        let profile = UserProfile {
            login: Some("ada".into()),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            phone: Some("+44".into()),
            country_id: Some(44),
            state: Some(2),
            platform: Some(3),
            wallets: vec![
                Wallet {
                    is_active: false,
                    number: Some("W-0".into()),
                    balance: Some(1.0),
                    currency_id: Some(9),
                },
                Wallet {
                    is_active: true,
                    number: Some("W-1".into()),
                    balance: Some(12.5),
                    currency_id: Some(4),
                },
            ],
            ..UserProfile::default()
        };

        let record = build_client_record(&input("5", Some(&profile)));
        assert_eq!(record.login, "ada");
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "Lovelace");
        assert_eq!(record.phone, "+44");
        assert_eq!(record.country_id, 44);
        assert_eq!(record.state, 2);
        assert_eq!(record.platform, 3);
        assert_eq!(record.account.active_wallet, "W-1");
        assert_eq!(record.account.balance, 12.5);
        assert_eq!(record.account.currency_id, 4);
    }

    #[test]
    fn no_active_wallet_leaves_zero_account() {
        let profile = UserProfile::default();
        let record = build_client_record(&input("5", Some(&profile)));
        assert_eq!(record.account, Account::default());
    }

    #[test]
    fn orphan_defaults_and_inferred_registration() {
        let top_up = action("entity", 1_690_000_000);
        let record = build_client_record(&SynthesisInput {
            top_up: Some(&top_up),
            fallback_country_id: 77,
            ..input("7", None)
        });

        assert_eq!(record.country_id, 77);
        assert_eq!(record.platform, 0);
        assert_eq!(record.account.currency_id, ORPHAN_CURRENCY_ID);
        assert_eq!(record.created_at, 1_690_000_000);
        assert_eq!(record.reactivation_threshold, 0);
    }

    #[test]
    fn country_override_beats_wallet_currency() {
        let profile = UserProfile {
            wallets: vec![Wallet {
                is_active: true,
                currency_id: Some(9),
                ..Wallet::default()
            }],
            ..UserProfile::default()
        };

        for (country, currency) in [(213, 1), (181, 2), (233, 3)] {
            let record = build_client_record(&SynthesisInput {
                fallback_country_id: country,
                ..input("8", Some(&profile))
            });
            assert_eq!(record.account.currency_id, currency);
        }

        let record = build_client_record(&SynthesisInput {
            fallback_country_id: 10,
            ..input("8", Some(&profile))
        });
        assert_eq!(record.account.currency_id, 9);
    }

    #[test]
    fn reactivation_threshold_is_last_activity_minus_window() {
        let bet = action("bet", 1_700_000_000);
        let profile = UserProfile::default();

        let record = build_client_record(&SynthesisInput {
            bet: Some(&bet),
            inactivity_months: Some(1),
            ..input("42", Some(&profile))
        });
        assert_eq!(record.reactivation_threshold, 1_700_000_000 - SECONDS_PER_MONTH);
        assert!(record.can_reactivate);

        let record = build_client_record(&SynthesisInput {
            bet: Some(&bet),
            now: 1_000_000_000,
            inactivity_months: Some(1),
            ..input("42", Some(&profile))
        });
        assert!(!record.can_reactivate);
    }

    #[test]
    fn threshold_only_computed_with_window() {
        let bet = action("bet", 1_700_000_000);
        let record = build_client_record(&SynthesisInput {
            bet: Some(&bet),
            ..input("7", None)
        });
        assert_eq!(record.reactivation_threshold, 0);
        assert!(!record.can_reactivate);
    }
}
