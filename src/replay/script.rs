// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use meetpoint::{EngineConfig, LatLng, PlacePage, Point};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub geocodes: BTreeMap<String, LatLng>,
    /// Served as page 1, 2, ... of every refresh.
    #[serde(default)]
    pub places: Vec<PlacePage>,
    pub steps: Vec<Step>,
}

fn default_session_id() -> String {
    "replay".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    AddAddress { id: String, address: String },
    UpdateAddress { id: String, address: String },
    Upsert { id: String, lat: f64, lng: f64 },
    Put { point: Point },
    Remove { id: String },
    Wait { ms: u64 },
}

impl Script {
    pub fn parse(raw: &str) -> anyhow::Result<Script> {
        let script: Script = serde_json::from_str(raw)?;
        script.config.validate()?;
        Ok(script)
    }

    pub fn load(path: &Path) -> anyhow::Result<Script> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read {}: {}", path.display(), e))?;
        Script::parse(&raw)
    }
}
