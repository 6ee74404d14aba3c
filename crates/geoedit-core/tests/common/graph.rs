#![allow(dead_code)]

use geoedit_core::{EditSession, Entity, EntityId, EntityKind, LatLon, Member};
use proptest::prelude::*;

/// Raw recipe for a random, acyclic editing graph
#[derive(Debug, Clone)]
pub struct GraphRecipe {
    pub tagged: Vec<bool>,
    pub paths: Vec<(Vec<usize>, bool)>,
    pub groups: Vec<Vec<(u8, usize)>>,
}

/// Entities created from a recipe, by kind, in creation order
#[derive(Debug, Default)]
pub struct Graph {
    pub points: Vec<EntityId>,
    pub paths: Vec<EntityId>,
    pub groups: Vec<EntityId>,
}

impl Graph {
    pub fn all(&self) -> Vec<EntityId> {
        self.points
            .iter()
            .chain(&self.paths)
            .chain(&self.groups)
            .copied()
            .collect()
    }
}

pub fn graph_recipe() -> impl Strategy<Value = GraphRecipe> {
    (
        prop::collection::vec(any::<bool>(), 3..12),
        prop::collection::vec((prop::collection::vec(0usize..16, 2..6), any::<bool>()), 0..5),
        prop::collection::vec(prop::collection::vec((0u8..3, 0usize..16), 0..4), 0..4),
    )
        .prop_map(|(tagged, paths, groups)| GraphRecipe {
            tagged,
            paths,
            groups,
        })
}

/// Materialize a recipe; group members only point at earlier groups
pub fn build(session: &mut EditSession, recipe: &GraphRecipe) -> Graph {
    let mut graph = Graph::default();
    for (i, tagged) in recipe.tagged.iter().enumerate() {
        let mut point = Entity::point(LatLon::new(0.0, i as f64 * 0.001));
        if *tagged {
            point = point.with_tag("name", format!("p{i}"));
        }
        graph.points.push(point.id);
        session.store_mut().add(point).unwrap();
    }

    for (raw, closed) in &recipe.paths {
        let mut nodes: Vec<EntityId> = Vec::new();
        for index in raw {
            let id = graph.points[index % graph.points.len()];
            if !nodes.contains(&id) {
                nodes.push(id);
            }
        }
        if nodes.len() < 2 {
            continue;
        }
        if *closed && nodes.len() >= 3 {
            nodes.push(nodes[0]);
        }
        let path = Entity::path(nodes);
        graph.paths.push(path.id);
        session.store_mut().add(path).unwrap();
    }

    for raw in &recipe.groups {
        let members: Vec<Member> = raw
            .iter()
            .filter_map(|(kind, index)| {
                let (kind, pool) = match kind {
                    0 => (EntityKind::Point, &graph.points),
                    1 => (EntityKind::Path, &graph.paths),
                    _ => (EntityKind::Group, &graph.groups),
                };
                (!pool.is_empty()).then(|| Member::new("", kind, pool[index % pool.len()]))
            })
            .collect();
        let group = Entity::group(members);
        graph.groups.push(group.id);
        session.store_mut().add(group).unwrap();
    }
    graph
}

/// Pick ids from the graph by raw index
pub fn pick(graph: &Graph, raw: &[usize]) -> Vec<EntityId> {
    let all = graph.all();
    let mut picked: Vec<EntityId> = raw.iter().map(|i| all[i % all.len()]).collect();
    picked.sort();
    picked.dedup();
    picked
}
