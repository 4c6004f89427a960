//! Immutable cluster snapshots captured once per composition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One server group as seen by the cluster-state provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroup {
    /// The server group name (e.g. `app-main-v003`).
    pub name: String,
    /// When the server group was created.
    pub created_at: DateTime<Utc>,
    /// Whether the group is attached to traffic.
    pub enabled: bool,
    /// Whether the group's instances report healthy.
    pub healthy: bool,
}

impl ServerGroup {
    /// Creates an enabled, healthy server group.
    #[must_use]
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
            enabled: true,
            healthy: true,
        }
    }

    /// Marks the group disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Marks the group unhealthy.
    #[must_use]
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }
}

/// A point-in-time view of the server groups in a cluster.
///
/// The snapshot is never mutated after capture; composition is a pure
/// function of the stage context and this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    server_groups: Vec<ServerGroup>,
    captured_at: DateTime<Utc>,
}

impl ClusterSnapshot {
    /// Captures a snapshot of the given groups at the current time.
    #[must_use]
    pub fn new(server_groups: Vec<ServerGroup>) -> Self {
        Self::captured_at(server_groups, Utc::now())
    }

    /// Captures a snapshot of the given groups at an explicit time.
    #[must_use]
    pub fn captured_at(server_groups: Vec<ServerGroup>, captured_at: DateTime<Utc>) -> Self {
        Self {
            server_groups,
            captured_at,
        }
    }

    /// Creates a snapshot of an empty cluster (first deploy).
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the groups in provider order.
    #[must_use]
    pub fn server_groups(&self) -> &[ServerGroup] {
        &self.server_groups
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Returns the number of groups in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.server_groups.len()
    }

    /// Returns true if the cluster has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.server_groups.is_empty()
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServerGroup> {
        self.server_groups.iter().find(|g| g.name == name)
    }

    /// Returns all groups ordered oldest-first, ties broken by name.
    ///
    /// Composition only ever iterates groups in this order, so flows do not
    /// depend on the order the provider returned them in.
    #[must_use]
    pub fn oldest_first(&self) -> Vec<&ServerGroup> {
        let mut groups: Vec<&ServerGroup> = self.server_groups.iter().collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        groups
    }

    /// Returns the enabled groups, oldest-first.
    #[must_use]
    pub fn enabled_groups(&self) -> Vec<&ServerGroup> {
        self.oldest_first().into_iter().filter(|g| g.enabled).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_oldest_first_orders_by_creation_then_name() {
        let snapshot = ClusterSnapshot::new(vec![
            ServerGroup::new("app-v003", at(3)),
            ServerGroup::new("app-v001", at(1)),
            ServerGroup::new("app-v002b", at(2)),
            ServerGroup::new("app-v002a", at(2)),
        ]);

        let names: Vec<&str> = snapshot.oldest_first().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["app-v001", "app-v002a", "app-v002b", "app-v003"]);
    }

    #[test]
    fn test_enabled_groups() {
        let snapshot = ClusterSnapshot::new(vec![
            ServerGroup::new("app-v002", at(2)),
            ServerGroup::new("app-v001", at(1)).disabled(),
        ]);

        let enabled = snapshot.enabled_groups();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "app-v002");
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ClusterSnapshot::empty();
        assert!(snapshot.is_empty());
        assert!(snapshot.enabled_groups().is_empty());
        assert!(snapshot.get("app-v001").is_none());
    }

    #[test]
    fn test_server_group_serde() {
        let group = ServerGroup::new("app-v001", at(1)).disabled();
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["createdAt"], "2024-05-01T01:00:00Z");
        assert_eq!(json["enabled"], false);

        let back: ServerGroup = serde_json::from_value(json).unwrap();
        assert_eq!(back, group);
    }
}
