//! Topological sequencing of one batch

use super::graph::{Dependency, DependencyGraph};
use crate::resource::ResourceRecord;
use std::collections::{HashMap, HashSet};

/// Order `resources` so that every resource comes after the dependencies
/// recorded for it in `graph`.
///
/// Post-order depth-first walk starting from each resource in input order.
/// Dependencies that do not resolve to a member of `resources` are skipped.
/// The visited set stops cycles: members of a cycle come out in the order
/// the walk first reached them. Records sharing an id are emitted once.
pub fn sequence<'a>(
    resources: &[&'a ResourceRecord],
    graph: &DependencyGraph<'a>,
) -> Vec<&'a ResourceRecord> {
    let mut lookup: HashMap<&str, &'a ResourceRecord> = HashMap::with_capacity(resources.len());
    for &resource in resources {
        lookup.entry(resource.id.as_str()).or_insert(resource);
    }

    let mut walk = Walk {
        graph,
        lookup,
        visited: HashSet::with_capacity(resources.len()),
        ordered: Vec::with_capacity(resources.len()),
    };
    for &resource in resources {
        walk.visit(resource);
    }
    walk.ordered
}

struct Walk<'g, 'a> {
    graph: &'g DependencyGraph<'a>,
    lookup: HashMap<&'a str, &'a ResourceRecord>,
    visited: HashSet<&'a str>,
    ordered: Vec<&'a ResourceRecord>,
}

impl<'a> Walk<'_, 'a> {
    fn visit(&mut self, resource: &'a ResourceRecord) {
        if !self.visited.insert(resource.id.as_str()) {
            return;
        }

        let graph = self.graph;
        for dependency in graph.dependencies_of(&resource.id) {
            if let Some(next) = self.resolve(dependency) {
                self.visit(next);
            }
        }
        self.ordered.push(resource);
    }

    fn resolve(&self, dependency: &Dependency<'a>) -> Option<&'a ResourceRecord> {
        self.lookup.get(dependency.id()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::build_graph;
    use crate::resource::registry::{NETWORK_INTERFACE, PUBLIC_IP, SUBNET, VIRTUAL_MACHINE, VIRTUAL_NETWORK};
    use crate::testing::record;

    fn ids<'a>(ordered: &[&'a ResourceRecord]) -> Vec<&'a str> {
        ordered.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_lower_rank_comes_first() {
        let vm = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1", VIRTUAL_MACHINE);
        let nic = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1", NETWORK_INTERFACE);
        let ip = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/ip1", PUBLIC_IP);
        let refs = vec![&vm, &nic, &ip];

        let graph = build_graph(&refs);
        let ordered = sequence(&refs, &graph);

        assert_eq!(ids(&ordered), vec!["ip1", "nic1", "vm1"]);
    }

    #[test]
    fn test_containment_and_priority_together() {
        let vnet = record("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1", VIRTUAL_NETWORK);
        let subnet = record(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/default",
            SUBNET,
        );
        let refs = vec![&vnet, &subnet];

        let graph = build_graph(&refs);
        let ordered = sequence(&refs, &graph);

        // Both heuristics apply, the walk still yields each resource once
        assert_eq!(ordered.len(), 2);
        assert_eq!(ids(&ordered), vec!["default", "vnet1"]);
    }

    #[test]
    fn test_bare_id_dependencies_resolve_against_input() {
        let a = record("/x/a", "Custom/a");
        let b = record("/x/b", "Custom/b");
        let refs = vec![&a, &b];

        let mut graph = DependencyGraph::new();
        graph.add_node(&a.id);
        graph.add_node(&b.id);
        graph.add_edge(&a.id, Dependency::Id(&b.id));
        graph.add_edge(&a.id, Dependency::Id("/x/missing"));

        assert_eq!(ids(&sequence(&refs, &graph)), vec!["b", "a"]);
    }

    #[test]
    fn test_dependencies_outside_input_are_skipped() {
        let a = record("/x/a", "Custom/a");
        let outsider = record("/x/outsider", "Custom/o");
        let refs = vec![&a];

        let mut graph = DependencyGraph::new();
        graph.add_edge(&a.id, Dependency::Resource(&outsider));

        assert_eq!(ids(&sequence(&refs, &graph)), vec!["a"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let a = record("/x/a", "Custom/a");
        let b = record("/x/b", "Custom/b");
        let c = record("/x/c", "Custom/c");
        let refs = vec![&a, &b, &c];

        let mut graph = DependencyGraph::new();
        graph.add_edge(&a.id, Dependency::Resource(&b));
        graph.add_edge(&b.id, Dependency::Resource(&c));
        graph.add_edge(&c.id, Dependency::Resource(&a));
        graph.add_edge(&c.id, Dependency::Resource(&c));

        let ordered = sequence(&refs, &graph);
        assert_eq!(ids(&ordered), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_empty_input() {
        let graph = DependencyGraph::new();
        assert!(sequence(&[], &graph).is_empty());
    }
}
