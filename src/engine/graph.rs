//! Dependency graph construction
//!
//! Edges come from two heuristics, not from provider metadata:
//!
//! - type priority: a resource of a lower-ranked type is listed as a
//!   dependency of every resource of a higher-ranked type, so it is visited
//!   (and deleted) first;
//! - containment: when one ID is a substring of another (a subnet inside its
//!   virtual network), the contained-in resource is listed as a dependency of
//!   the longer one. IDs are compared ignoring ASCII case.

use crate::resource::registry::known_priority;
use crate::resource::ResourceRecord;
use std::collections::HashMap;

/// One entry in a resource's dependency list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency<'a> {
    Resource(&'a ResourceRecord),
    /// Bare ID, resolved against the batch when sequencing
    Id(&'a str),
}

impl Dependency<'_> {
    pub fn id(&self) -> &str {
        match self {
            Dependency::Resource(r) => &r.id,
            Dependency::Id(id) => id,
        }
    }
}

/// Map from resource id to the resources to visit before it
#[derive(Debug, Default)]
pub struct DependencyGraph<'a> {
    edges: HashMap<&'a str, Vec<Dependency<'a>>>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with an empty dependency list
    pub fn add_node(&mut self, id: &'a str) {
        self.edges.entry(id).or_default();
    }

    /// Record that `id` must be visited after `dependency`
    pub fn add_edge(&mut self, id: &'a str, dependency: Dependency<'a>) {
        self.edges.entry(id).or_default().push(dependency);
    }

    pub fn dependencies_of(&self, id: &str) -> &[Dependency<'a>] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

/// Build the dependency graph for one batch. Pairwise, O(n^2).
pub fn build_graph<'a>(resources: &[&'a ResourceRecord]) -> DependencyGraph<'a> {
    let mut graph = DependencyGraph::new();
    for &resource in resources {
        graph.add_node(&resource.id);
    }

    let priorities: Vec<Option<u8>> = resources
        .iter()
        .map(|r| known_priority(&r.resource_type))
        .collect();
    // ARM IDs compare case-insensitively
    let folded: Vec<String> = resources.iter().map(|r| r.id.to_ascii_lowercase()).collect();

    for (i, &resource) in resources.iter().enumerate() {
        for (j, &other) in resources.iter().enumerate() {
            if folded[i] == folded[j] {
                continue;
            }

            if let (Some(p), Some(q)) = (priorities[i], priorities[j]) {
                if p < q {
                    graph.add_edge(&other.id, Dependency::Resource(resource));
                }
            }

            if folded[i].contains(folded[j].as_str()) {
                graph.add_edge(&resource.id, Dependency::Resource(other));
            }
        }
    }

    tracing::debug!(
        "Built dependency graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::{NETWORK_INTERFACE, PUBLIC_IP, SUBNET, VIRTUAL_MACHINE, VIRTUAL_NETWORK};
    use crate::testing::record;

    fn dep_ids<'a>(graph: &'a DependencyGraph<'_>, id: &str) -> Vec<&'a str> {
        graph.dependencies_of(id).iter().map(|d| d.id()).collect()
    }

    #[test]
    fn test_priority_edges() {
        let vm = record("/subs/123/rg/test/providers/Microsoft.Compute/virtualMachines/testvm", VIRTUAL_MACHINE);
        let nic = record("/subs/123/rg/test/providers/Microsoft.Network/networkInterfaces/testnic", NETWORK_INTERFACE);
        let ip = record("/subs/123/rg/test/providers/Microsoft.Network/publicIPAddresses/testip", PUBLIC_IP);
        let refs = vec![&vm, &nic, &ip];

        let graph = build_graph(&refs);

        assert_eq!(graph.node_count(), 3);
        assert!(dep_ids(&graph, &vm.id).contains(&nic.id.as_str()));
        assert!(dep_ids(&graph, &vm.id).contains(&ip.id.as_str()));
        assert_eq!(dep_ids(&graph, &nic.id), vec![ip.id.as_str()]);
        assert!(graph.dependencies_of(&ip.id).is_empty());
    }

    #[test]
    fn test_unknown_types_get_no_priority_edges() {
        let vault = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv", "Microsoft.KeyVault/vaults");
        let vm = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm", VIRTUAL_MACHINE);
        let nic = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic", NETWORK_INTERFACE);
        let refs = vec![&vault, &vm, &nic];

        let graph = build_graph(&refs);

        assert!(graph.dependencies_of(&vault.id).is_empty());
        assert!(!dep_ids(&graph, &vm.id).contains(&vault.id.as_str()));
        assert!(!dep_ids(&graph, &nic.id).contains(&vault.id.as_str()));
    }

    #[test]
    fn test_containment_edges_apply_to_unknown_types() {
        let parent = record("/subscriptions/s/resourceGroups/rg/providers/Custom.Thing/things/a", "Custom.Thing/things");
        let child = record(
            "/subscriptions/s/resourceGroups/rg/providers/Custom.Thing/things/a/children/b",
            "Custom.Thing/things/children",
        );
        let refs = vec![&parent, &child];

        let graph = build_graph(&refs);

        assert_eq!(dep_ids(&graph, &child.id), vec![parent.id.as_str()]);
        assert!(graph.dependencies_of(&parent.id).is_empty());
    }

    #[test]
    fn test_containment_ignores_id_case() {
        let vnet = record(
            "/subscriptions/s/resourceGroups/RG/providers/Microsoft.Network/virtualNetworks/v",
            VIRTUAL_NETWORK,
        );
        let subnet = record(
            "/subscriptions/s/resourcegroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/d",
            SUBNET,
        );
        let refs = vec![&vnet, &subnet];

        let graph = build_graph(&refs);

        assert_eq!(dep_ids(&graph, &subnet.id), vec![vnet.id.as_str()]);
        assert_eq!(dep_ids(&graph, &vnet.id), vec![subnet.id.as_str()]);
    }

    #[test]
    fn test_same_id_in_other_case_gets_no_edge() {
        let upper = record("/subscriptions/s/resourceGroups/RG/providers/Custom.Thing/things/a", "Custom.Thing/things");
        let lower = record("/subscriptions/s/resourcegroups/rg/providers/custom.thing/things/a", "Custom.Thing/things");

        let graph = build_graph(&[&upper, &lower]);

        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_no_self_edges_and_empty_input() {
        let vm = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm", VIRTUAL_MACHINE);
        let graph = build_graph(&[&vm]);
        assert!(graph.dependencies_of(&vm.id).is_empty());

        let empty = build_graph(&[]);
        assert_eq!(empty.node_count(), 0);
        assert_eq!(empty.edge_count(), 0);
    }
}
