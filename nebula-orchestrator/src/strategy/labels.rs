//! Reserved container labels and deterministic naming. §5, §6.

use std::collections::HashMap;

use nebula_core::{ServiceId, Slot};

pub fn container_name(service_name: &str, slot: Slot) -> String {
    format!("nebula-{service_name}-{slot}")
}

pub fn network_name(project_name: &str, slot: Slot) -> String {
    format!("{project_name}-{slot}_default")
}

pub fn db_volume_name(service_name: &str) -> String {
    format!("nebula-db-{service_name}-data")
}

pub fn managed_labels(
    project_name: &str,
    service_name: &str,
    service_id: ServiceId,
    slot: Slot,
) -> HashMap<String, String> {
    HashMap::from([
        ("nebula.app".to_string(), service_name.to_string()),
        ("nebula.app_id".to_string(), service_id.to_string()),
        ("nebula.slot".to_string(), slot.to_string()),
        ("nebula.service".to_string(), service_name.to_string()),
        ("nebula.project".to_string(), project_name.to_string()),
        ("nebula.managed".to_string(), "true".to_string()),
    ])
}
