use cache_snapshot::{CachePersistenceStrategy, EnvelopeCodec, FixedDirectory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A small stand-in for a service capabilities cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCache {
    pub id: String,
    pub offerings: BTreeMap<String, Vec<String>>,
    pub max_phenomenon_time: Option<u64>,
}

impl ContentCache {
    pub fn new(id: &str) -> Self {
        let mut offerings = BTreeMap::new();
        offerings.insert(
            "air_temperature".to_string(),
            vec!["station-1".to_string(), "station-7".to_string()],
        );
        offerings.insert("wind_speed".to_string(), vec!["station-3".to_string()]);
        Self {
            id: id.to_string(),
            offerings,
            max_phenomenon_time: Some(1_700_000_000),
        }
    }
}

pub fn strategy_in(dir: &Path) -> CachePersistenceStrategy {
    cache_snapshot::logging::init_logging(1, false);
    CachePersistenceStrategy::init(&FixedDirectory::new(dir), EnvelopeCodec::new(1)).unwrap()
}
