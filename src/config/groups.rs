use crate::config::descriptor::ConnectionDescriptor;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate view over one group of descriptors. Derived on demand, never
/// stored independently.
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub connection_count: usize,
    pub databases: Vec<String>,
    pub hosts: Vec<String>,
}

/// Read-only index over a descriptor set. Holds borrowed descriptors only, so
/// it can never drift from the set it was built from; a reload rebuilds it.
pub struct GroupIndex<'a> {
    descriptors: &'a [ConnectionDescriptor],
}

impl<'a> GroupIndex<'a> {
    pub fn new(descriptors: &'a [ConnectionDescriptor]) -> Self {
        GroupIndex { descriptors }
    }

    /// Group name to aggregate view, every descriptor included regardless of
    /// its enabled flag.
    pub fn groups(&self) -> BTreeMap<String, GroupView> {
        let mut groups: BTreeMap<String, GroupView> = BTreeMap::new();
        for d in self.descriptors {
            let view = groups.entry(d.group.clone()).or_insert_with(|| GroupView {
                connection_count: 0,
                databases: Vec::new(),
                hosts: Vec::new(),
            });
            view.connection_count += 1;
            view.databases.push(d.database.clone());
            let host_port = d.host_port();
            if !view.hosts.contains(&host_port) {
                view.hosts.push(host_port);
            }
        }
        groups
    }

    /// Descriptors eligible for scheduling and execution, original order kept.
    pub fn enabled_descriptors(&self) -> Vec<&'a ConnectionDescriptor> {
        self.descriptors.iter().filter(|d| d.enabled).collect()
    }

    /// All descriptors of one group, original order kept.
    pub fn by_group(&self, group: &str) -> Vec<&'a ConnectionDescriptor> {
        self.descriptors.iter().filter(|d| d.group == group).collect()
    }

    /// Group names in descriptor order, first occurrence wins.
    pub fn group_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for d in self.descriptors {
            if !names.contains(&d.group) {
                names.push(d.group.clone());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_connections;

    #[test]
    fn groups_aggregate_counts_databases_and_hosts() {
        let descriptors =
            parse_connections("mysql://u:p@h:3306/db1,db2;mysql://u2:p2@h2:3307/db3").unwrap();
        let index = GroupIndex::new(&descriptors);
        let groups = index.groups();

        assert_eq!(groups.len(), 2);
        let first = &groups["h:3306"];
        assert_eq!(first.connection_count, 2);
        assert_eq!(first.databases, ["db1", "db2"]);
        assert_eq!(first.hosts, ["h:3306"]);
        assert_eq!(groups["h2:3307"].connection_count, 1);
    }

    #[test]
    fn disabled_descriptor_absent_from_enabled_but_present_in_groups() {
        let raw = r#"[
            {"name": "a", "connection": "mysql://u:p@h:3306/d1"},
            {"name": "b", "connection": "mysql://u:p@h:3306/d2", "enabled": false}
        ]"#;
        let descriptors = parse_connections(raw).unwrap();
        let index = GroupIndex::new(&descriptors);

        let enabled = index.enabled_descriptors();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "a");

        let groups = index.groups();
        assert!(groups.contains_key("b"));
        assert_eq!(groups["b"].connection_count, 1);
    }

    #[test]
    fn by_group_preserves_order() {
        let descriptors = parse_connections("mysql://u:p@h:3306/db2,db1").unwrap();
        let index = GroupIndex::new(&descriptors);
        let members = index.by_group("h:3306");
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].database, "db2");
        assert_eq!(members[1].database, "db1");
    }
}
