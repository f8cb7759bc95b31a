//! JSON fixture files: `{ "Orders": { "key": "OrderID", "records": [...] } }`.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::domain::Record;
use tracing::info;

use crate::InMemoryDataService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSet {
    pub key: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixture(pub BTreeMap<String, FixtureSet>);

impl Fixture {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid fixture JSON")
    }
}

pub async fn load_fixture(path: impl AsRef<Path>) -> Result<InMemoryDataService> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let fixture = Fixture::from_json(&raw)
        .with_context(|| format!("failed to parse fixture {}", path.display()))?;
    let service = InMemoryDataService::from_fixture(fixture)
        .await
        .with_context(|| format!("fixture {} holds a non-object record", path.display()))?;
    info!(path = %path.display(), sets = ?service.entity_sets().await, "fixture loaded");
    Ok(service)
}

pub async fn save_fixture(service: &InMemoryDataService, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let raw = serde_json::to_string_pretty(&service.snapshot().await)
        .context("failed to serialize fixture")?;
    tokio::fs::write(path, raw)
        .await
        .with_context(|| format!("failed to write fixture {}", path.display()))?;
    info!(path = %path.display(), "fixture saved");
    Ok(())
}
