use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub active_wallet: String,
    pub balance: f64,
    pub currency_id: i64,
}

/// Per-user record returned in one of the classification buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub platform: i64,
    /// Registration time, possibly inferred from the earliest action.
    pub created_at: i64,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    // Consumers read the account under its historical key.
    #[serde(rename = "Account")]
    pub account: Account,
    pub country_id: i64,
    pub state: i64,
    pub last_top_up: i64,
    pub last_bet: i64,
    pub last_withdrawal: i64,
    pub user_id: String,
    pub last_activity: i64,
    pub reactivation_threshold: i64,
    pub can_reactivate: bool,
}

impl ClientRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}
