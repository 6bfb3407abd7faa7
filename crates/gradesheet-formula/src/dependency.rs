//! Dependency tracking for computed columns

use crate::ast::FormulaExpr;
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;

/// Column names referenced by a formula, in first-appearance order
///
/// Function names are not column references.
pub fn column_references(expr: &FormulaExpr) -> Vec<String> {
    fn walk(expr: &FormulaExpr, seen: &mut AHashSet<String>, out: &mut Vec<String>) {
        match expr {
            FormulaExpr::Number(_) | FormulaExpr::String(_) => {}
            FormulaExpr::ColumnRef(name) => {
                if seen.insert(name.clone()) {
                    out.push(name.clone());
                }
            }
            FormulaExpr::BinaryOp { left, right, .. } => {
                walk(left, seen, out);
                walk(right, seen, out);
            }
            FormulaExpr::UnaryOp { operand, .. } => walk(operand, seen, out),
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    walk(arg, seen, out);
                }
            }
        }
    }

    let mut seen = AHashSet::new();
    let mut out = Vec::new();
    walk(expr, &mut seen, &mut out);
    out
}

/// Dependency graph between computed columns
///
/// Nodes keep their insertion order, and every ordering the graph produces
/// breaks ties by that order, so the result never depends on hashing.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    ids: AHashMap<String, usize>,
    /// Node → nodes that depend on it
    dependents: Vec<Vec<usize>>,
    /// Node → nodes it depends on
    precedents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its id (existing nodes keep theirs)
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.dependents.push(Vec::new());
        self.precedents.push(Vec::new());
        id
    }

    /// Add a dependency: `dependent` depends on `precedent`
    ///
    /// Both nodes are added if missing. Repeated edges are ignored.
    pub fn add_dependency(&mut self, precedent: &str, dependent: &str) {
        let from = self.add_node(precedent);
        let to = self.add_node(dependent);
        if !self.precedents[to].contains(&from) {
            self.precedents[to].push(from);
            self.dependents[from].push(to);
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Order every node after all of its precedents
    ///
    /// Kahn's algorithm; among nodes that are ready at the same time, the one
    /// inserted first comes first. On a cycle, returns the names along one
    /// cycle with the first name repeated at the end (`a -> b -> a`).
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        let mut in_degree: Vec<usize> = self.precedents.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<usize> = (0..self.len()).filter(|&id| in_degree[id] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            for &dependent in &self.dependents[id] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() == self.len() {
            return Ok(order.into_iter().map(|id| self.names[id].clone()).collect());
        }

        Err(self.find_cycle(&in_degree))
    }

    /// Walk precedents among the nodes Kahn's algorithm left behind until a
    /// node repeats. Every leftover node has a leftover precedent, so the walk
    /// always closes.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<String> {
        let remaining = |id: usize| in_degree[id] > 0;
        let start = (0..self.len()).find(|&id| remaining(id)).unwrap_or_default();

        let mut path = vec![start];
        let mut on_path = AHashMap::new();
        on_path.insert(start, 0usize);
        let mut current = start;

        loop {
            let next = match self.precedents[current].iter().copied().find(|&p| remaining(p)) {
                Some(next) => next,
                None => break,
            };
            if let Some(&pos) = on_path.get(&next) {
                let mut cycle: Vec<String> = path[pos..]
                    .iter()
                    .map(|&id| self.names[id].clone())
                    .collect();
                cycle.push(self.names[next].clone());
                return cycle;
            }
            on_path.insert(next, path.len());
            path.push(next);
            current = next;
        }

        path.into_iter().map(|id| self.names[id].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_references() {
        let ast = parse_formula("round(lab1 + lab2 * lab1, 1) - max(exam, 0)").unwrap();
        assert_eq!(column_references(&ast), vec!["lab1", "lab2", "exam"]);

        let ast = parse_formula("1 + 'x'").unwrap();
        assert!(column_references(&ast).is_empty());
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("twice", "quad");
        graph.add_dependency("twice", "quad");

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.precedents[1], vec![0]);
        assert_eq!(graph.dependents[0], vec![1]);
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.add_node("quad");
        graph.add_node("twice");
        graph.add_dependency("twice", "quad");

        assert_eq!(graph.topological_order().unwrap(), vec!["twice", "quad"]);
    }

    #[test]
    fn test_topological_order_keeps_insertion_order_for_ties() {
        let mut graph = DependencyGraph::new();
        for name in ["c", "a", "b", "d"] {
            graph.add_node(name);
        }
        graph.add_dependency("b", "d");

        assert_eq!(graph.topological_order().unwrap(), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_node("ok");
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "a");
        graph.add_dependency("a", "c");

        assert_eq!(graph.topological_order().unwrap_err(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "a");

        assert_eq!(graph.topological_order().unwrap_err(), vec!["a", "a"]);
    }
}
