//! Catalog of the event indices tracked for user activity.
//!
//! Every index belongs to one category and stores its creation timestamp under
//! `<timestamp_path>.createdAt`, or under a flat `createdAt` when no path is set.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexCategory {
    TopUp,
    Bet,
    Withdrawal,
    Generic,
}

impl IndexCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexCategory::TopUp => "top_up",
            IndexCategory::Bet => "bet",
            IndexCategory::Withdrawal => "withdrawal",
            IndexCategory::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub category: IndexCategory,
    #[serde(default)]
    pub timestamp_path: Option<String>,
}

impl IndexSpec {
    pub fn new(name: &str, category: IndexCategory, timestamp_path: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            category,
            timestamp_path: timestamp_path.map(str::to_string),
        }
    }

    /// Field used to sort this index's documents newest-first.
    pub fn sort_field(&self) -> String {
        match self.timestamp_path.as_deref() {
            Some(path) if !path.is_empty() => format!("{path}.createdAt"),
            _ => "createdAt".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexCatalog {
    indices: Vec<IndexSpec>,
}

impl Default for IndexCatalog {
    fn default() -> Self {
        Self {
            indices: vec![
                IndexSpec::new("balance-deposits", IndexCategory::TopUp, Some("entity")),
                IndexSpec::new("card-deposits", IndexCategory::TopUp, Some("card")),
                IndexSpec::new("sport-bets", IndexCategory::Bet, Some("bet")),
                IndexSpec::new("casino-bets", IndexCategory::Bet, Some("bet")),
                IndexSpec::new("withdrawals", IndexCategory::Withdrawal, Some("withdrawal")),
                IndexSpec::new("bonus-activations", IndexCategory::Generic, None),
            ],
        }
    }
}

impl IndexCatalog {
    pub fn new(indices: Vec<IndexSpec>) -> Result<Self> {
        let catalog = Self { indices };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reads a catalog from a TOML/JSON/YAML file of `[[indices]]` entries.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let catalog: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads the catalog from `path` when given, the built-in one otherwise.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) if !path.is_empty() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn all(&self) -> &[IndexSpec] {
        &self.indices
    }

    pub fn get(&self, name: &str) -> Option<&IndexSpec> {
        self.indices.iter().find(|spec| spec.name == name)
    }

    /// Candidate indices for one category, in catalog order.
    pub fn category(&self, category: IndexCategory) -> impl Iterator<Item = &IndexSpec> {
        self.indices
            .iter()
            .filter(move |spec| spec.category == category)
    }

    fn validate(&self) -> Result<()> {
        if self.indices.is_empty() {
            return Err(AppError::Configuration(
                "index catalog must list at least one index".into(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.indices {
            if spec.name.trim().is_empty() {
                return Err(AppError::Configuration("index name must not be empty".into()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(AppError::Configuration(format!(
                    "index {} is listed twice",
                    spec.name
                )));
            }
        }

        Ok(())
    }
}
