//! Proxy admin-API types. §4.7, §6 "Proxy admin capability set".

use nebula_core::Slot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub domain: String,
    pub path_prefix: String,
    pub upstream: Upstream,
    pub slot: Slot,
    pub ssl: bool,
}

impl Route {
    pub fn new(domain: impl Into<String>, upstream: Upstream, slot: Slot) -> Self {
        Self {
            domain: domain.into(),
            path_prefix: "/".to_string(),
            upstream,
            slot,
            ssl: false,
        }
    }
}
