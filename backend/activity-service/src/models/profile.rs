use serde_json::{Map, Value};

use super::{as_integer, render_number};

/// Client profile decoded from a `clients-searcher` document.
///
/// Fields with an unexpected JSON type are treated as missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub created_at: Option<i64>,
    pub login: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub country_id: Option<i64>,
    pub state: Option<i64>,
    pub platform: Option<i64>,
    pub wallets: Vec<Wallet>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wallet {
    pub is_active: bool,
    pub number: Option<String>,
    pub balance: Option<f64>,
    pub currency_id: Option<i64>,
}

impl UserProfile {
    pub fn from_document(document: &Map<String, Value>) -> Self {
        let user = document.get("user").and_then(Value::as_object);
        let stats = document.get("stats").and_then(Value::as_object);

        let text = |key: &str| {
            user.and_then(|u| u.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let integer = |key: &str| user.and_then(|u| u.get(key)).and_then(as_integer);

        let wallets = document
            .get("wallets")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Wallet::from_document)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            created_at: integer("createdAt"),
            login: text("login"),
            first_name: text("firstName"),
            last_name: text("lastName"),
            phone: text("phone"),
            country_id: integer("countryId"),
            state: integer("state"),
            platform: stats.and_then(|s| s.get("platform")).and_then(as_integer),
            wallets,
        }
    }

    /// First wallet flagged active, if any.
    pub fn active_wallet(&self) -> Option<&Wallet> {
        self.wallets.iter().find(|wallet| wallet.is_active)
    }
}

impl Wallet {
    fn from_document(document: &Map<String, Value>) -> Self {
        let is_active = match document.get("isActive") {
            Some(Value::Bool(flag)) => *flag,
            Some(value) => value.as_f64() == Some(1.0),
            None => false,
        };

        let number = match document.get("no") {
            Some(Value::String(number)) => Some(number.clone()),
            Some(value) => render_number(value),
            None => None,
        };

        Self {
            is_active,
            number,
            balance: document.get("balance").and_then(Value::as_f64),
            currency_id: document.get("currencyId").and_then(as_integer),
        }
    }
}
