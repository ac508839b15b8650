//! Producer to consumer dependencies of a demand tree

use crate::calculator::{DemandTree, NodeId};

/// One resolved input of a consumer, supplied by a producer node
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub producer: NodeId,
    pub consumer: NodeId,
    /// Input slot on the consumer this edge fills
    pub slot: usize,
    pub item: String,
    pub rate: f64,
}

/// Collect every edge in depth-first order.
///
/// Raw inputs have no producer node and yield no edge.
pub fn collect_edges(tree: &DemandTree) -> Vec<Edge> {
    let mut edges = Vec::new();
    collect_from(tree, tree.root(), &mut edges);
    edges
}

fn collect_from(tree: &DemandTree, consumer: NodeId, edges: &mut Vec<Edge>) {
    for (slot, input) in tree.node(consumer).inputs.iter().enumerate() {
        let Some(producer) = input.upstream else {
            continue;
        };
        edges.push(Edge {
            producer,
            consumer,
            slot,
            item: input.item.clone(),
            rate: input.rate,
        });
        collect_from(tree, producer, edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::build_demand_tree;
    use crate::catalog::RecipeCatalog;
    use crate::models::{ItemRate, Recipe};

    #[test]
    fn edges_in_traversal_order() {
        let catalog = RecipeCatalog::new(vec![
            Recipe::new(
                "rotor",
                ItemRate::new("Rotor", 4.0),
                vec![
                    ItemRate::new("Ore", 10.0),
                    ItemRate::new("Rod", 20.0),
                    ItemRate::new("Screw", 100.0),
                ],
                "Assembler",
            ),
            Recipe::new(
                "rod",
                ItemRate::new("Rod", 15.0),
                vec![ItemRate::new("Ingot", 15.0)],
                "Constructor",
            ),
            Recipe::new(
                "screw",
                ItemRate::new("Screw", 40.0),
                vec![ItemRate::new("Rod", 10.0)],
                "Constructor",
            ),
        ]);
        let tree = build_demand_tree(&catalog, "Rotor", 4.0, false).unwrap();
        let edges = collect_edges(&tree);

        let summary: Vec<(&str, usize, f64)> = edges
            .iter()
            .map(|e| (e.item.as_str(), e.slot, e.rate))
            .collect();
        assert_eq!(
            summary,
            vec![("Rod", 1, 20.0), ("Screw", 2, 100.0), ("Rod", 0, 25.0)]
        );
        assert!(edges.iter().all(|e| e.producer != e.consumer));
        assert_eq!(edges[0].consumer, tree.root());
    }
}
