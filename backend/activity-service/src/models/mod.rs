pub mod action;
pub mod client;
pub mod profile;

pub use action::{created_at_of, extract_created_at, ActionRecord};
pub use client::{Account, ClientRecord};
pub use profile::{UserProfile, Wallet};

use serde_json::Value;

use crate::error::AppError;

/// Parses the decimal user id carried through the API as a string.
pub fn parse_user_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::InvalidUserId(raw.to_string()))
}

/// Reads a JSON number as an integer, truncating floating values.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|number| number as i64))
}

/// Renders a numeric id the way it is stored in the search documents.
pub(crate) fn render_number(value: &Value) -> Option<String> {
    if let Some(number) = value.as_i64() {
        return Some(number.to_string());
    }
    value.as_f64().map(|number| format!("{number:.0}"))
}
