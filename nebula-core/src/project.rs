//! Project entity. §3.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;

/// A logical grouping of services. Created on request, mutable, and only
/// deletable once no [`crate::service::Service`] references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Unique, lowercase, DNS-label safe.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub default_repo_url: Option<String>,
    pub default_branch: Option<String>,
    pub env: HashMap<String, String>,
}

impl Project {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            default_repo_url: None,
            default_branch: None,
            env: HashMap::new(),
        }
    }
}
