//! Builder contract types. §4.2.

use std::collections::HashMap;

use nebula_core::{ProjectId, ServiceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct BuildContext {
    pub project_id: ProjectId,
    pub service_id: ServiceId,
    pub source_dir: String,
    /// Monorepo subdirectory, relative to `source_dir`.
    pub subdirectory: Option<String>,
    pub builder_name: Option<String>,
    pub port_hint: Option<u16>,
    pub start_command: Option<String>,
    pub build_args: HashMap<String, String>,
    pub image_name: String,
    pub image_tag: String,
}

impl BuildContext {
    /// The directory builders should actually read from: `source_dir`
    /// joined with `subdirectory` when one is set.
    pub fn effective_source_dir(&self) -> String {
        match &self.subdirectory {
            Some(sub) if !sub.is_empty() => format!("{}/{sub}", self.source_dir.trim_end_matches('/')),
            _ => self.source_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub image_id: String,
    pub image_name: String,
    pub image_tag: String,
    pub build_log: String,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectResult {
    pub can_build: bool,
    pub score: u8,
}

impl DetectResult {
    pub const NO_MATCH: DetectResult = DetectResult {
        can_build: false,
        score: 0,
    };

    pub fn matched(score: u8) -> Self {
        Self {
            can_build: true,
            score,
        }
    }
}
