//! Topological scheduler — a deterministic, dependency-respecting order.
//!
//! Kahn's algorithm with a min-heap as the ready set: whenever several
//! vertices are ready at once, the one declared earliest in the flow runs
//! first. The same flow therefore always yields the same order, and that order
//! is what clients see in the `vertices_sorted` event.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{CycleError, ValidationError};
use crate::graph::Graph;
use crate::models::{Flow, Vertex};

/// Order every vertex of `graph` (by index) so that dependencies come first.
///
/// Terminates on any input; a graph with a cycle yields [`CycleError`] naming
/// the vertices that could not be placed.
pub fn topological_order(graph: &Graph) -> Result<Vec<usize>, CycleError> {
    let n = graph.len();
    let mut in_degree: Vec<usize> = (0..n).map(|i| graph.dependencies(i).len()).collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(n);

    while let Some(Reverse(vertex)) = ready.pop() {
        order.push(vertex);
        for &next in graph.dependents(vertex) {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != n {
        let unsorted = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| graph.id(i).to_owned())
            .collect();
        return Err(CycleError { unsorted });
    }

    Ok(order)
}

/// A validated flow plus its execution order; what a job runs.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    flow: Flow,
    graph: Graph,
    order: Vec<usize>,
}

impl ExecutionPlan {
    /// Validate `flow` and compute its order.
    ///
    /// # Errors
    /// Any [`ValidationError`] raised by the graph model or the scheduler.
    pub fn new(flow: Flow) -> Result<Self, ValidationError> {
        let graph = Graph::unchecked(&flow)?;
        let order = topological_order(&graph)?;
        Ok(Self { flow, graph, order })
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Execution order as vertex indices.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Execution order as vertex IDs.
    pub fn order_ids(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|&i| self.graph.id(i).to_owned())
            .collect()
    }

    pub fn vertex(&self, index: usize) -> &Vertex {
        &self.flow.vertices[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Edge;

    fn plan(ids: &[&str], edges: &[(&str, &str)]) -> Result<ExecutionPlan, ValidationError> {
        ExecutionPlan::new(Flow::new(
            "test",
            ids.iter().map(|id| Vertex::new(*id, "mock")).collect(),
            edges.iter().map(|(f, t)| Edge::new(*f, *t)).collect(),
        ))
    }

    #[test]
    fn linear_chain_is_ordered() {
        let plan = plan(&["a", "b", "c"], &[("a", "b"), ("b", "c")]).unwrap();
        assert_eq!(plan.order_ids(), vec!["a", "b", "c"]);
        assert_eq!(plan.order(), [0, 1, 2]);
    }

    #[test]
    fn declaration_order_does_not_override_dependencies() {
        let plan = plan(&["c", "b", "a"], &[("a", "b"), ("b", "c")]).unwrap();
        assert_eq!(plan.order_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn independent_vertices_keep_insertion_order() {
        let plan = plan(&["z", "m", "a"], &[]).unwrap();
        assert_eq!(plan.order_ids(), vec!["z", "m", "a"]);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        // root fans out to x and y; y was declared before x.
        let plan = plan(
            &["root", "y", "x", "join"],
            &[("root", "x"), ("root", "y"), ("x", "join"), ("y", "join")],
        )
        .unwrap();
        assert_eq!(plan.order_ids(), vec!["root", "y", "x", "join"]);
    }

    #[test]
    fn newly_ready_vertex_with_lower_index_jumps_ahead() {
        // b depends on d; once d runs, b (index 1) precedes c (index 2).
        let plan = plan(&["d", "b", "c"], &[("d", "b")]).unwrap();
        assert_eq!(plan.order_ids(), vec!["d", "b", "c"]);
    }

    #[test]
    fn same_flow_yields_same_order() {
        let edges = [("a", "d"), ("b", "d"), ("c", "e"), ("d", "e")];
        let first = plan(&["a", "b", "c", "d", "e"], &edges).unwrap();
        let second = plan(&["a", "b", "c", "d", "e"], &edges).unwrap();
        assert_eq!(first.order_ids(), second.order_ids());
        assert_eq!(first.order_ids(), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn cycle_reports_unsorted_vertices_and_terminates() {
        // a → b ⇄ c, d independent
        let graph = Graph::unchecked(&Flow::new(
            "cyclic",
            ["a", "b", "c", "d"].iter().map(|id| Vertex::new(*id, "mock")).collect(),
            vec![Edge::new("a", "b"), Edge::new("b", "c"), Edge::new("c", "b")],
        ))
        .unwrap();

        let err = topological_order(&graph).unwrap_err();
        assert_eq!(err.unsorted, vec!["b", "c"]);
        assert!(err.to_string().contains("b, c"));
    }

    #[test]
    fn plan_rejects_cycles_as_validation_errors() {
        assert!(matches!(
            plan(&["a", "b"], &[("a", "b"), ("b", "a")]),
            Err(ValidationError::Cycle(_))
        ));
    }
}
