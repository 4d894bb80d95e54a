//! Search requests issued by the pipeline.
//!
//! Everything here is pure: a [`SearchRequest`] describes one query and is
//! rendered into the engine's JSON body by [`SearchRequest::to_body`].

use serde_json::{json, Map, Value};

use crate::indices::IndexSpec;

pub const ACTION_USER_FIELD: &str = "user.id";
pub const ACTION_COUNTRY_FIELD: &str = "user.countryId";
pub const PROFILE_USER_FIELD: &str = "stats.userId";
pub const PROFILE_COUNTRY_FIELD: &str = "user.countryId";

#[derive(Debug, Clone, PartialEq)]
pub struct TermFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    pub size: usize,
    pub from: usize,
    pub must: Vec<TermFilter>,
    /// Field sorted in descending order.
    pub sort_desc: Option<String>,
    pub source_fields: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn new(index: &str, size: usize) -> Self {
        Self {
            index: index.to_string(),
            size,
            from: 0,
            must: Vec::new(),
            sort_desc: None,
            source_fields: None,
        }
    }

    pub fn from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn term(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.must.push(TermFilter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sort_desc = Some(field.into());
        self
    }

    pub fn source(mut self, fields: &[&str]) -> Self {
        self.source_fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn has_term(&self, field: &str) -> bool {
        self.must.iter().any(|term| term.field == field)
    }

    pub fn to_body(&self) -> Value {
        let query = if self.must.is_empty() {
            json!({ "match_all": {} })
        } else {
            let must: Vec<Value> = self
                .must
                .iter()
                .map(|term| {
                    let mut clause = Map::new();
                    clause.insert(term.field.clone(), term.value.clone());
                    json!({ "term": clause })
                })
                .collect();
            json!({ "bool": { "must": must } })
        };

        let mut body = json!({
            "size": self.size,
            "from": self.from,
            "query": query,
        });

        if let Some(field) = &self.sort_desc {
            let mut sort = Map::new();
            sort.insert(field.clone(), json!({ "order": "desc" }));
            body["sort"] = json!([sort]);
        }
        if let Some(fields) = &self.source_fields {
            body["_source"] = json!(fields);
        }

        body
    }
}

/// Most recent actions of one user in one index; `country_id` 0 means any country.
pub fn actions_query(spec: &IndexSpec, user_id: i64, country_id: i64, size: usize) -> SearchRequest {
    let mut request = SearchRequest::new(&spec.name, size).term(ACTION_USER_FIELD, user_id);
    if country_id != 0 {
        request = request.term(ACTION_COUNTRY_FIELD, country_id);
    }
    request.sort_desc(spec.sort_field())
}

pub fn profile_query(clients_index: &str, user_id: i64) -> SearchRequest {
    SearchRequest::new(clients_index, 1).term(PROFILE_USER_FIELD, user_id)
}

/// One page of user ids, optionally restricted to a country.
pub fn user_ids_query(clients_index: &str, from: usize, size: usize, country_id: i64) -> SearchRequest {
    let mut request = SearchRequest::new(clients_index, size)
        .from(from)
        .source(&[PROFILE_USER_FIELD]);
    if country_id != 0 {
        request = request.term(PROFILE_COUNTRY_FIELD, country_id);
    }
    request
}
