//! Production chain calculator logic

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::catalog::RecipeCatalog;
use crate::error::PlanError;

/// Index of a node inside a [`DemandTree`]; assigned in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One machine group producing one item at one rate
#[derive(Debug, Clone)]
pub struct DemandNode {
    pub item: String,
    pub recipe_id: String,
    pub machine: String,
    pub rate: f64,
    /// Fractional machine count, rounded up only when machines are placed
    pub machines: f64,
    pub inputs: Vec<InputDemand>,
}

impl DemandNode {
    /// Number of physical machines needed
    pub fn machine_instances(&self) -> usize {
        self.machines.ceil().max(1.0) as usize
    }
}

#[derive(Debug, Clone)]
pub struct InputDemand {
    pub item: String,
    pub rate: f64,
    /// `None` when the item is a raw material
    pub upstream: Option<NodeId>,
}

/// Demand tree rooted at the planning target
#[derive(Debug, Clone)]
pub struct DemandTree {
    nodes: Vec<DemandNode>,
    pub diagnostics: Vec<String>,
}

impl DemandTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &DemandNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DemandNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

/// Calculate the demand tree for a target item at a given rate.
///
/// Fails only when the target itself has no recipe. Inputs without a recipe
/// stay childless and count as raw materials.
pub fn build_demand_tree(
    catalog: &RecipeCatalog,
    item: &str,
    rate: f64,
    prefer_alternate: bool,
) -> Result<DemandTree, PlanError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(PlanError::InvalidRate(rate));
    }

    let mut builder = TreeBuilder {
        catalog,
        prefer_alternate,
        nodes: Vec::new(),
        diagnostics: Vec::new(),
        resolving: Vec::new(),
    };

    match builder.expand(item, rate) {
        Some(_) => Ok(DemandTree {
            nodes: builder.nodes,
            diagnostics: builder.diagnostics,
        }),
        None => Err(PlanError::UncraftableRoot(item.to_string())),
    }
}

struct TreeBuilder<'a> {
    catalog: &'a RecipeCatalog,
    prefer_alternate: bool,
    nodes: Vec<DemandNode>,
    diagnostics: Vec<String>,
    /// Items currently being expanded on the recursion stack
    resolving: Vec<String>,
}

impl TreeBuilder<'_> {
    fn expand(&mut self, item: &str, rate: f64) -> Option<NodeId> {
        if self.resolving.iter().any(|r| r == item) {
            let message = format!(
                "recipe cycle: '{}' is needed while producing itself ({}), treated as raw input",
                item,
                self.resolving.join(" -> ")
            );
            warn!("{}", message);
            self.diagnostics.push(message);
            return None;
        }

        let recipe = self.catalog.resolve(item, self.prefer_alternate)?;
        let machines = rate / recipe.output.rate;
        debug!(
            "{} @ {:.3}/min -> {:.3}x {} ({})",
            item, rate, machines, recipe.machine, recipe.id
        );

        let id = NodeId(self.nodes.len());
        self.nodes.push(DemandNode {
            item: item.to_string(),
            recipe_id: recipe.id.clone(),
            machine: recipe.machine.clone(),
            rate,
            machines,
            inputs: Vec::new(),
        });

        self.resolving.push(item.to_string());
        let mut inputs = Vec::with_capacity(recipe.inputs.len());
        for input in &recipe.inputs {
            let required = rate * input.rate / recipe.output.rate;
            let upstream = self.expand(&input.item, required);
            inputs.push(InputDemand {
                item: input.item.clone(),
                rate: required,
                upstream,
            });
        }
        self.resolving.pop();

        self.nodes[id.0].inputs = inputs;
        Some(id)
    }
}

/// Format a demand tree as a readable string
pub fn format_demand_tree(tree: &DemandTree) -> String {
    let mut output = String::new();
    format_node(tree, tree.root(), 0, &mut output);
    output
}

fn format_node(tree: &DemandTree, id: NodeId, indent: usize, output: &mut String) {
    let node = tree.node(id);
    let prefix = "  ".repeat(indent);

    output.push_str(&format!(
        "{}{:.2}x {} -> {} @ {:.2}/min ({})\n",
        prefix, node.machines, node.machine, node.item, node.rate, node.recipe_id
    ));

    for input in &node.inputs {
        match input.upstream {
            Some(child) => format_node(tree, child, indent + 1, output),
            None => output.push_str(&format!(
                "{}  <- {} @ {:.2}/min (raw input)\n",
                prefix, input.item, input.rate
            )),
        }
    }
}

/// Summary of a production chain calculation
#[derive(Debug)]
pub struct ChainSummary {
    pub target_item: String,
    pub target_rate: f64,
    /// Machine kind, fractional count, physical count
    pub machine_counts: Vec<(String, f64, usize)>,
    pub raw_inputs: Vec<(String, f64)>,
    pub diagnostics: Vec<String>,
}

/// Generate a summary of the demand tree
pub fn summarize_chain(tree: &DemandTree) -> ChainSummary {
    let mut machines: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let mut raw_inputs: BTreeMap<String, f64> = BTreeMap::new();

    for (_, node) in tree.iter() {
        let entry = machines.entry(node.machine.clone()).or_default();
        entry.0 += node.machines;
        entry.1 += node.machine_instances();

        for input in node.inputs.iter().filter(|i| i.upstream.is_none()) {
            *raw_inputs.entry(input.item.clone()).or_default() += input.rate;
        }
    }

    let root = tree.node(tree.root());
    ChainSummary {
        target_item: root.item.clone(),
        target_rate: root.rate,
        machine_counts: machines
            .into_iter()
            .map(|(kind, (fractional, physical))| (kind, fractional, physical))
            .collect(),
        raw_inputs: raw_inputs.into_iter().collect(),
        diagnostics: tree.diagnostics.clone(),
    }
}

impl std::fmt::Display for ChainSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(f, "Target: {} @ {:.2}/min", self.target_item, self.target_rate)?;
        writeln!(f)?;

        writeln!(f, "Machines required:")?;
        for (kind, fractional, physical) in &self.machine_counts {
            writeln!(f, "  {:.2}x {} ({} built)", fractional, kind, physical)?;
        }
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for (item, rate) in &self.raw_inputs {
            writeln!(f, "  {} @ {:.2}/min", item, rate)?;
        }

        if !self.diagnostics.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for message in &self.diagnostics {
                writeln!(f, "  {}", message)?;
            }
        }

        Ok(())
    }
}
