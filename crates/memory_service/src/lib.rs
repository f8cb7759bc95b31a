//! An in-process [`DataServiceClient`] over keyed JSON entity sets.
//!
//! Collection reads answer `{"results": [...]}` after filtering, sorting,
//! `$skip`, `$top` and `$select`; keyed reads answer the entity itself.
//! Failures carry an OData-style JSON body in `response_text`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{EntityKey, Record},
    error::{DataServiceError, ErrorCode},
    query::{EXPAND, SELECT, SKIP, TOP},
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use view_core::{DataServiceClient, ReadOptions, WriteOptions};

mod eval;
pub mod fixture;
pub mod path;

use eval::Entity;
pub use fixture::{load_fixture, save_fixture, Fixture, FixtureSet};
pub use path::{EntityPath, EntityPathError};

#[derive(Debug, Clone, Default)]
struct EntitySetData {
    key_field: String,
    entities: Vec<Entity>,
}

impl EntitySetData {
    fn position(&self, key: &EntityKey) -> Option<usize> {
        self.entities
            .iter()
            .position(|entity| key_matches(entity.get(&self.key_field), key))
    }

    /// Next integer key, for creates that omit the key on an integer-keyed set.
    fn next_int_key(&self) -> Option<i64> {
        let mut max = 0;
        for entity in &self.entities {
            match entity.get(&self.key_field) {
                Some(Value::Number(number)) => max = max.max(number.as_i64()?),
                _ => return None,
            }
        }
        Some(max + 1)
    }
}

fn key_matches(value: Option<&Value>, key: &EntityKey) -> bool {
    match (value, key) {
        (Some(Value::Number(number)), EntityKey::Int(key)) => number.as_i64() == Some(*key),
        (Some(Value::String(text)), EntityKey::Text(key)) => text == key,
        _ => false,
    }
}

fn key_of(value: &Value) -> Option<EntityKey> {
    match value {
        Value::Number(number) => number.as_i64().map(EntityKey::Int),
        Value::String(text) => Some(EntityKey::Text(text.clone())),
        _ => None,
    }
}

fn service_error(code: ErrorCode, message: impl Into<String>) -> DataServiceError {
    let message = message.into();
    let body = json!({
        "error": {
            "code": format!("{code:?}"),
            "message": { "value": message },
        }
    });
    DataServiceError::new(code, message).with_response_text(body.to_string())
}

fn parse_path(raw: &str) -> Result<EntityPath, DataServiceError> {
    raw.parse()
        .map_err(|err: EntityPathError| service_error(ErrorCode::BadRequest, err.to_string()))
}

fn parse_count(options: &ReadOptions, name: &str) -> Result<Option<usize>, DataServiceError> {
    options
        .url_parameters
        .get(name)
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|_| {
                service_error(
                    ErrorCode::BadRequest,
                    format!("invalid value '{raw}' for {name}"),
                )
            })
        })
        .transpose()
}

fn into_entity(payload: Record) -> Result<Entity, DataServiceError> {
    match payload {
        Value::Object(entity) => Ok(entity),
        other => Err(service_error(
            ErrorCode::BadRequest,
            format!("payload must be a JSON object, got {other}"),
        )),
    }
}

pub struct InMemoryDataService {
    sets: RwLock<HashMap<String, EntitySetData>>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl Default for InMemoryDataService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDataService {
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            latency: None,
            requests: AtomicUsize::new(0),
        }
    }

    /// Delays every request, e.g. to observe the busy indicator.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Declares (or replaces) an entity set keyed by `key_field`.
    pub async fn define_entity_set(
        &self,
        name: impl Into<String>,
        key_field: impl Into<String>,
        records: Vec<Record>,
    ) -> Result<(), DataServiceError> {
        let name = name.into();
        let data = EntitySetData {
            key_field: key_field.into(),
            entities: records
                .into_iter()
                .map(into_entity)
                .collect::<Result<_, _>>()?,
        };
        debug!(entity_set = %name, count = data.entities.len(), "entity set defined");
        self.sets.write().await.insert(name, data);
        Ok(())
    }

    pub async fn entity_sets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sets.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self, entity_set: &str) -> Option<usize> {
        self.sets
            .read()
            .await
            .get(entity_set)
            .map(|set| set.entities.len())
    }

    /// Number of requests received so far, successful or not.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Fixture {
        let sets = self.sets.read().await;
        let sets: BTreeMap<String, FixtureSet> = sets
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    FixtureSet {
                        key: data.key_field.clone(),
                        records: data.entities.iter().cloned().map(Value::Object).collect(),
                    },
                )
            })
            .collect();
        Fixture(sets)
    }

    pub async fn from_fixture(fixture: Fixture) -> Result<Self, DataServiceError> {
        let service = Self::new();
        for (name, set) in fixture.0 {
            service.define_entity_set(name, set.key, set.records).await?;
        }
        Ok(service)
    }

    async fn begin(&self, operation: &str, path: &str) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!(operation, path, "data service request");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn unknown_set(name: &str) -> DataServiceError {
    service_error(
        ErrorCode::NotFound,
        format!("Resource not found for segment '{name}'"),
    )
}

fn unknown_key(name: &str, key: &EntityKey) -> DataServiceError {
    service_error(
        ErrorCode::NotFound,
        format!("Resource not found for segment '{name}({key})'"),
    )
}

fn require_key(path: &EntityPath) -> Result<&EntityKey, DataServiceError> {
    path.key.as_ref().ok_or_else(|| {
        service_error(
            ErrorCode::BadRequest,
            format!("'{}' must address a single entity", path.entity_set),
        )
    })
}

#[async_trait]
impl DataServiceClient for InMemoryDataService {
    async fn read(&self, raw_path: &str, options: ReadOptions) -> Result<Record, DataServiceError> {
        self.begin("read", raw_path).await;
        let path = parse_path(raw_path)?;
        let select = options.url_parameters.get(SELECT);
        if let Some(expand) = options.url_parameters.get(EXPAND) {
            debug!(expand, "$expand has no effect on flat entity sets");
        }

        let sets = self.sets.read().await;
        let set = sets
            .get(&path.entity_set)
            .ok_or_else(|| unknown_set(&path.entity_set))?;

        if let Some(key) = &path.key {
            let index = set
                .position(key)
                .ok_or_else(|| unknown_key(&path.entity_set, key))?;
            return Ok(Value::Object(eval::project(set.entities[index].clone(), select)));
        }

        let skip = parse_count(&options, SKIP)?.unwrap_or(0);
        let top = parse_count(&options, TOP)?;

        let mut matched: Vec<Entity> = set
            .entities
            .iter()
            .filter(|entity| eval::matches_all(entity, &options.filters))
            .cloned()
            .collect();
        eval::sort(&mut matched, &options.sorters);

        let results: Vec<Value> = matched
            .into_iter()
            .skip(skip)
            .take(top.unwrap_or(usize::MAX))
            .map(|entity| Value::Object(eval::project(entity, select)))
            .collect();

        debug!(entity_set = %path.entity_set, count = results.len(), "read collection");
        Ok(json!({ "results": results }))
    }

    async fn create(
        &self,
        raw_path: &str,
        payload: Record,
        options: WriteOptions,
    ) -> Result<Record, DataServiceError> {
        self.begin("create", raw_path).await;
        let path = parse_path(raw_path)?;
        if path.key.is_some() {
            return Err(service_error(
                ErrorCode::BadRequest,
                "create must target an entity set, not a single entity",
            ));
        }
        let mut entity = into_entity(payload)?;

        let mut sets = self.sets.write().await;
        let set = sets
            .get_mut(&path.entity_set)
            .ok_or_else(|| unknown_set(&path.entity_set))?;

        let key = match entity.get(&set.key_field) {
            Some(value) => key_of(value).ok_or_else(|| {
                service_error(
                    ErrorCode::BadRequest,
                    format!("key property '{}' must be a string or integer", set.key_field),
                )
            })?,
            None => {
                let next = set.next_int_key().ok_or_else(|| {
                    service_error(
                        ErrorCode::BadRequest,
                        format!("key property '{}' is required", set.key_field),
                    )
                })?;
                entity.insert(set.key_field.clone(), json!(next));
                EntityKey::Int(next)
            }
        };

        if set.position(&key).is_some() {
            return Err(service_error(
                ErrorCode::Conflict,
                format!("entity {}({key}) already exists", path.entity_set),
            ));
        }

        set.entities.push(entity.clone());
        info!(
            entity_set = %path.entity_set,
            key = %key,
            refresh = options.refresh_after_change,
            "entity created"
        );
        Ok(Value::Object(entity))
    }

    async fn update(
        &self,
        raw_path: &str,
        payload: Record,
        options: WriteOptions,
    ) -> Result<Record, DataServiceError> {
        self.begin("update", raw_path).await;
        let path = parse_path(raw_path)?;
        let key = require_key(&path)?;
        let changes = into_entity(payload)?;

        let mut sets = self.sets.write().await;
        let set = sets
            .get_mut(&path.entity_set)
            .ok_or_else(|| unknown_set(&path.entity_set))?;

        if let Some(value) = changes.get(&set.key_field) {
            if !key_matches(Some(value), key) {
                return Err(service_error(
                    ErrorCode::BadRequest,
                    format!("key property '{}' cannot be changed", set.key_field),
                ));
            }
        }

        let index = set
            .position(key)
            .ok_or_else(|| unknown_key(&path.entity_set, key))?;
        let entity = &mut set.entities[index];
        entity.extend(changes);

        info!(
            entity_set = %path.entity_set,
            key = %key,
            refresh = options.refresh_after_change,
            "entity updated"
        );
        Ok(Value::Object(entity.clone()))
    }

    async fn remove(&self, raw_path: &str, options: WriteOptions) -> Result<Record, DataServiceError> {
        self.begin("delete", raw_path).await;
        let path = parse_path(raw_path)?;
        let key = require_key(&path)?;

        let mut sets = self.sets.write().await;
        let set = sets
            .get_mut(&path.entity_set)
            .ok_or_else(|| unknown_set(&path.entity_set))?;
        let index = set
            .position(key)
            .ok_or_else(|| unknown_key(&path.entity_set, key))?;
        set.entities.remove(index);

        info!(
            entity_set = %path.entity_set,
            key = %key,
            refresh = options.refresh_after_change,
            "entity deleted"
        );
        Ok(Value::Null)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
