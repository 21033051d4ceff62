use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ConfigPair;

/// Maps solution-level `Configuration|Platform` keys to the project-level
/// pair a project builds with.
///
/// Built once while parsing a solution. Inserting an existing key replaces
/// the previous value, so the last entry in the solution file wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMapping {
    entries: BTreeMap<String, ConfigPair>,
}

impl ConfigMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, solution_key: impl Into<String>, project_pair: ConfigPair) {
        self.entries.insert(solution_key.into(), project_pair);
    }

    /// Looks up the project-level pair for a solution-level key.
    pub fn get(&self, solution_key: &str) -> Option<&ConfigPair> {
        self.entries.get(solution_key)
    }

    /// Looks up the project-level pair for a solution configuration and platform.
    pub fn resolve(&self, configuration: &str, platform: &str) -> Option<&ConfigPair> {
        self.get(&format!("{}|{}", configuration, platform))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<(String, ConfigPair)> for ConfigMapping {
    fn from_iter<I: IntoIterator<Item = (String, ConfigPair)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (key, pair) in iter {
            mapping.insert(key, pair);
        }
        mapping
    }
}
