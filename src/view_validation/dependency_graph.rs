//! View-to-class dependency graph and cycle detection.
//!
//! Nodes live in an arena indexed by `usize`; view classes come first, in
//! candidate order, followed by any non-view class they reference.

use std::collections::HashMap;

use log::{debug, info};

use super::reference_extractor::extract_references;
use crate::schema_catalog::{ClassId, SchemaCatalog, ViewClassDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    /// On the DFS stack
    Grey,
    Black,
}

/// A cycle found from one root. `chain` starts and ends with the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub root: ClassId,
    pub chain: Vec<ClassId>,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<ClassId>,
    names: Vec<String>,
    index: HashMap<ClassId, usize>,
    edges: Vec<Vec<usize>>,
    view_count: usize,
}

impl DependencyGraph {
    /// Build the graph over every view class in `views`. Names in the view
    /// queries that do not resolve in `catalog` are ignored.
    pub fn build(catalog: &SchemaCatalog, views: &[ViewClassDefinition]) -> Self {
        let mut graph = DependencyGraph::default();
        for view in views {
            graph.add_node(view.class_id, &view.qualified_name);
        }
        graph.view_count = graph.nodes.len();

        for view in views {
            let from = graph.index[&view.class_id];
            for reference in extract_references(&view.raw_query_text) {
                let Some(schema) = &reference.schema else {
                    continue;
                };
                let Some(class) = catalog.find_class(schema, &reference.name) else {
                    debug!(
                        "View {} references unresolvable name '{}'",
                        view.qualified_name,
                        reference.qualified()
                    );
                    continue;
                };
                let to = graph.add_node(class.id, &class.qualified_name());
                if !graph.edges[from].contains(&to) {
                    graph.edges[from].push(to);
                }
            }
        }

        info!(
            "View dependency graph: {} view(s), {} node(s), {} edge(s)",
            graph.view_count,
            graph.nodes.len(),
            graph.edge_count()
        );
        graph
    }

    fn add_node(&mut self, id: ClassId, name: &str) -> usize {
        if let Some(&existing) = self.index.get(&id) {
            return existing;
        }
        let node = self.nodes.len();
        self.nodes.push(id);
        self.names.push(name.to_string());
        self.edges.push(Vec::new());
        self.index.insert(id, node);
        node
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Classes `id` references directly.
    pub fn dependencies(&self, id: ClassId) -> Vec<ClassId> {
        self.index
            .get(&id)
            .map(|&node| self.edges[node].iter().map(|&n| self.nodes[n]).collect())
            .unwrap_or_default()
    }

    pub fn name(&self, id: ClassId) -> Option<&str> {
        self.index.get(&id).map(|&node| self.names[node].as_str())
    }

    /// Render a chain as `A -> B -> A`.
    pub fn format_chain(&self, chain: &[ClassId]) -> String {
        chain
            .iter()
            .map(|id| self.name(*id).unwrap_or("?"))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Run a DFS from every view and report the cycles that pass through the
    /// root. A k-cycle is therefore reported k times, once per member, each
    /// rotated to start at its root.
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let mut cycles = Vec::new();
        for root in 0..self.view_count {
            let mut colour = vec![Colour::White; self.nodes.len()];
            // (node, next edge to follow)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            let mut path: Vec<usize> = vec![root];
            colour[root] = Colour::Grey;

            while let Some(top) = stack.last_mut() {
                let (node, edge) = *top;
                top.1 += 1;
                let Some(&next) = self.edges[node].get(edge) else {
                    colour[node] = Colour::Black;
                    stack.pop();
                    path.pop();
                    continue;
                };
                match colour[next] {
                    Colour::Grey if next == root => {
                        let mut chain: Vec<ClassId> = path.iter().map(|&n| self.nodes[n]).collect();
                        chain.push(self.nodes[root]);
                        let cycle = Cycle {
                            root: self.nodes[root],
                            chain,
                        };
                        if !cycles.contains(&cycle) {
                            cycles.push(cycle);
                        }
                    }
                    Colour::White => {
                        colour[next] = Colour::Grey;
                        stack.push((next, 0));
                        path.push(next);
                    }
                    // Cycles not through the root are reported from their own root
                    _ => {}
                }
            }
        }
        if !cycles.is_empty() {
            info!("Found {} view reference cycle(s)", cycles.len());
        }
        cycles
    }

    /// View classes in DFS post-order: every view comes after the views it
    /// references. Views on a cycle are ordered arbitrarily among themselves.
    pub fn dependency_order(&self) -> Vec<ClassId> {
        let mut order = Vec::with_capacity(self.view_count);
        let mut colour = vec![Colour::White; self.nodes.len()];
        for root in 0..self.view_count {
            if colour[root] != Colour::White {
                continue;
            }
            colour[root] = Colour::Grey;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some(top) = stack.last_mut() {
                let (node, edge) = *top;
                top.1 += 1;
                match self.edges[node].get(edge) {
                    Some(&next) if colour[next] == Colour::White => {
                        colour[next] = Colour::Grey;
                        stack.push((next, 0));
                    }
                    Some(_) => {}
                    None => {
                        colour[node] = Colour::Black;
                        stack.pop();
                        if node < self.view_count {
                            order.push(self.nodes[node]);
                        }
                    }
                }
            }
        }
        order
    }
}
