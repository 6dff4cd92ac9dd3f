use std::path::Path;

use flowtrace_core::{DEFAULT_RESPONSE_TEXT_CAP, TruncationPolicy};
use serde::{Deserialize, Serialize};

use crate::filter::HostFilter;
use crate::worker::ExportWorkerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportSettings {
    pub truncation: TruncationSettings,
    pub filter: FilterSettings,
    pub worker: WorkerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TruncationSettings {
    pub response_text_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterSettings {
    pub host_contains: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerSettings {
    pub workers: usize,
    pub queue_depth: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            truncation: TruncationSettings::default(),
            filter: FilterSettings::default(),
            worker: WorkerSettings::default(),
        }
    }
}

impl Default for TruncationSettings {
    fn default() -> Self {
        Self {
            response_text_cap: DEFAULT_RESPONSE_TEXT_CAP,
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            host_contains: None,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_depth: 256,
        }
    }
}

impl ExportSettings {
    pub fn load_or_create(path: &Path) -> Result<Self, String> {
        if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
            toml::from_str(&raw).map_err(|err| err.to_string())
        } else {
            let settings = Self::default();
            settings.save(path)?;
            Ok(settings)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let contents = toml::to_string_pretty(self).map_err(|err| err.to_string())?;
        std::fs::write(path, contents).map_err(|err| err.to_string())
    }

    pub fn truncation_policy(&self) -> TruncationPolicy {
        TruncationPolicy {
            response_text_cap: self.truncation.response_text_cap,
        }
    }

    pub fn host_filter(&self) -> Option<HostFilter> {
        self.filter.host_contains.as_deref().map(HostFilter::new)
    }

    pub fn worker_config(&self) -> ExportWorkerConfig {
        ExportWorkerConfig {
            workers: self.worker.workers.max(1),
            queue_depth: self.worker.queue_depth.max(1),
        }
    }
}
