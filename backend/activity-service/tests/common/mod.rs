//! In-memory search gateway for pipeline and HTTP tests.
//!
//! Evaluates the subset of the query language the service emits: term
//! filters on dotted paths, a single descending sort and from/size paging.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use activity_service::gateway::{SearchError, SearchGateway, SearchHit};
use activity_service::query::SearchRequest;
use activity_service::{AppState, IndexCatalog};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub const CLIENTS_INDEX: &str = "clients-searcher";

#[derive(Clone, Default)]
pub struct InMemoryGateway {
    documents: Arc<Mutex<HashMap<String, Vec<Map<String, Value>>>>>,
    /// Indices that fail every search.
    failing: Arc<Mutex<HashSet<String>>>,
    /// Indices whose next search fails once.
    failing_once: Arc<Mutex<HashSet<String>>>,
    /// (index, field) pairs that fail whenever the request filters on the field.
    failing_terms: Arc<Mutex<HashSet<(String, String)>>>,
    /// Indices that answer only after a delay.
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
    unreachable: Arc<Mutex<bool>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, index: &str, document: Value) {
        let Value::Object(document) = document else {
            panic!("documents must be JSON objects");
        };
        self.documents
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .push(document);
    }

    pub fn fail_index(&self, index: &str) {
        self.failing.lock().unwrap().insert(index.to_string());
    }

    pub fn fail_next(&self, index: &str) {
        self.failing_once.lock().unwrap().insert(index.to_string());
    }

    pub fn fail_when_filtered(&self, index: &str, field: &str) {
        self.failing_terms
            .lock()
            .unwrap()
            .insert((index.to_string(), field.to_string()));
    }

    pub fn delay_index(&self, index: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(index.to_string(), delay);
    }

    pub fn set_unreachable(&self) {
        *self.unreachable.lock().unwrap() = true;
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, index: &str) -> Vec<SearchRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.index == index)
            .collect()
    }

    pub fn into_state(self, catalog: IndexCatalog) -> AppState {
        AppState::new(Arc::new(self), CLIENTS_INDEX, Arc::new(catalog), None)
    }

    fn failure(request: &SearchRequest) -> SearchError {
        SearchError::Status {
            status: 500,
            body: format!("simulated failure on {}", request.index),
        }
    }
}

/// Value at a dotted path such as `user.countryId`.
pub fn lookup_path<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

#[async_trait]
impl SearchGateway for InMemoryGateway {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = self.delays.lock().unwrap().get(&request.index).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.unreachable.lock().unwrap() || self.failing.lock().unwrap().contains(&request.index) {
            return Err(Self::failure(request));
        }

        if self.failing_once.lock().unwrap().remove(&request.index) {
            return Err(Self::failure(request));
        }

        let failing_term = self
            .failing_terms
            .lock()
            .unwrap()
            .iter()
            .any(|(index, field)| *index == request.index && request.has_term(field));
        if failing_term {
            return Err(Self::failure(request));
        }

        let documents = self.documents.lock().unwrap();
        let mut matched: Vec<Map<String, Value>> = documents
            .get(&request.index)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| {
                        request.must.iter().all(|term| {
                            lookup_path(doc, &term.field)
                                .map(|value| values_match(value, &term.value))
                                .unwrap_or(false)
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = &request.sort_desc {
            matched.sort_by(|a, b| {
                let a = lookup_path(a, field).and_then(Value::as_f64);
                let b = lookup_path(b, field).and_then(Value::as_f64);
                match (a, b) {
                    (Some(a), Some(b)) => b.total_cmp(&a),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
        }

        Ok(matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|source| SearchHit {
                index: request.index.clone(),
                source,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), SearchError> {
        if *self.unreachable.lock().unwrap() {
            return Err(SearchError::Status {
                status: 503,
                body: "cluster unreachable".to_string(),
            });
        }
        Ok(())
    }
}
