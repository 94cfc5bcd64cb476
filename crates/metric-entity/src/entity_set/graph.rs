//! Parent to child entity-set references used for market averages.
//!
//! The graph is an arena of `petgraph` node indices addressed through the
//! stable entity-set id. Cycles are rejected once, when the graph is
//! loaded, so traversals at query time never need a visited-depth guard.

use std::collections::BTreeSet;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use tracing::{debug, warn};

use metric_core::collections::FxHashMap;
use metric_core::errors::EntityError;
use metric_core::models::{EntitySetConfiguration, EntitySetId};

use super::parse_instance_list;
use crate::registry::EntityInstanceRepository;

#[derive(Debug, Clone)]
struct EntitySetNode {
    config: EntitySetConfiguration,
    instances: BTreeSet<i32>,
}

/// Validated, acyclic entity-set average-mapping graph.
#[derive(Debug, Clone, Default)]
pub struct EntitySetGraph {
    graph: DiGraph<EntitySetNode, ()>,
    index: FxHashMap<EntitySetId, NodeIndex>,
}

impl EntitySetGraph {
    /// Build the graph, resolving instance lists against `instances`.
    ///
    /// Disabled sets are skipped, as are references to them. An unknown
    /// child id or any cycle fails the whole load.
    pub fn load(
        configs: Vec<EntitySetConfiguration>,
        instances: &EntityInstanceRepository,
    ) -> Result<Self, EntityError> {
        let disabled: BTreeSet<EntitySetId> = configs
            .iter()
            .filter(|c| c.is_disabled)
            .map(|c| c.id)
            .collect();

        let mut graph = DiGraph::new();
        let mut index = FxHashMap::default();
        for config in configs.into_iter().filter(|c| !c.is_disabled) {
            if index.contains_key(&config.id) {
                return Err(EntityError::DuplicateEntitySet { id: config.id });
            }
            let mut ids = parse_instance_list(&config.instances)?;
            ids.retain(|id| {
                let known = instances.contains(&config.entity_type, *id);
                if !known {
                    warn!(
                        entity_set = config.id,
                        entity_type = %config.entity_type,
                        instance = *id,
                        "dropping unknown instance from entity set"
                    );
                }
                known
            });
            let id = config.id;
            let node = graph.add_node(EntitySetNode {
                config,
                instances: ids,
            });
            index.insert(id, node);
        }

        let mut edges = Vec::new();
        for parent in graph.node_indices() {
            for child_id in &graph[parent].config.child_average_mappings {
                match index.get(child_id) {
                    Some(child) => edges.push((parent, *child)),
                    None if disabled.contains(child_id) => debug!(
                        parent = graph[parent].config.id,
                        child = *child_id,
                        "skipping mapping to disabled entity set"
                    ),
                    None => return Err(EntityError::UnknownEntitySet { id: *child_id }),
                }
            }
        }
        for (parent, child) in edges {
            graph.add_edge(parent, child, ());
        }

        let loaded = Self { graph, index };
        loaded.reject_cycles()?;
        Ok(loaded)
    }

    fn reject_cycles(&self) -> Result<(), EntityError> {
        for component in tarjan_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|n| self.graph.contains_edge(*n, *n));
            if !is_cycle {
                continue;
            }
            let mut ids: Vec<EntitySetId> = component
                .iter()
                .map(|n| self.graph[*n].config.id)
                .collect();
            ids.sort_unstable();
            if let Some(first) = ids.first().copied() {
                ids.push(first);
            }
            let path = ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(EntityError::AverageMappingCycle { path });
        }
        Ok(())
    }

    fn node(&self, id: EntitySetId) -> Result<NodeIndex, EntityError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(EntityError::UnknownEntitySet { id })
    }

    pub fn get(&self, id: EntitySetId) -> Option<&EntitySetConfiguration> {
        self.index.get(&id).map(|n| &self.graph[*n].config)
    }

    /// Resolved instance ids of the set itself.
    pub fn instances(&self, id: EntitySetId) -> Result<Vec<i32>, EntityError> {
        let node = self.node(id)?;
        Ok(self.graph[node].instances.iter().copied().collect())
    }

    /// Direct children, ascending by id.
    pub fn children(&self, id: EntitySetId) -> Result<Vec<EntitySetId>, EntityError> {
        let node = self.node(id)?;
        let mut children: Vec<EntitySetId> = self
            .graph
            .neighbors(node)
            .map(|n| self.graph[n].config.id)
            .collect();
        children.sort_unstable();
        Ok(children)
    }

    /// Instances of the set and of every set reachable through its
    /// average mappings, deduplicated and ascending.
    pub fn average_instances(&self, id: EntitySetId) -> Result<Vec<i32>, EntityError> {
        let start = self.node(id)?;
        let mut all = BTreeSet::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            all.extend(self.graph[node].instances.iter().copied());
        }
        Ok(all.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
