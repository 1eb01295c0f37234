use crate::config::{ConnectionDescriptor, GroupIndex, GroupView};
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of the current descriptor set for the embedding control surface.
/// Disabled descriptors are included; only execution skips them.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub total_database_count: usize,
    pub enabled_database_count: usize,
    pub connection_groups: BTreeMap<String, GroupView>,
}

pub fn build_status(descriptors: &[ConnectionDescriptor]) -> StatusReport {
    let index = GroupIndex::new(descriptors);
    StatusReport {
        total_database_count: descriptors.len(),
        enabled_database_count: index.enabled_descriptors().len(),
        connection_groups: index.groups(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_connections;

    #[test]
    fn status_counts_and_groups() {
        let raw = r#"[
            {"name": "a", "connection": "mysql://u:p@h1:3306/d1"},
            {"name": "b", "connection": "mysql://u:p@h2:3306/d2", "enabled": false}
        ]"#;
        let descriptors = parse_connections(raw).unwrap();
        let status = build_status(&descriptors);

        assert_eq!(status.total_database_count, 2);
        assert_eq!(status.enabled_database_count, 1);
        assert_eq!(status.connection_groups.len(), 2);
        assert_eq!(status.connection_groups["b"].hosts, ["h2:3306"]);
    }

    #[test]
    fn status_serializes_without_credentials() {
        let descriptors = parse_connections("mysql://u:hunter2@h:3306/app").unwrap();
        let json = serde_json::to_string(&build_status(&descriptors)).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
