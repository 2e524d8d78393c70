//! Execution graph: an arena of actions hanging off one synthetic root.

use roomproto::Device;

use crate::action::{Action, ActionId};

pub const ROOT_ACTION: &str = "Start";
pub const ROOT_GENERATOR: &str = "DefaultReconciler";

/// A forest of per-device action chains under a single root.
///
/// The root is always overridden and never dispatched. Its children are the
/// head of each device's chain; every other action has at most one child.
/// Built by the [`Reconciler`](crate::reconciler::Reconciler) and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    actions: Vec<Action>,
    root: ActionId,
}

impl ExecutionGraph {
    /// An empty graph: just the root.
    pub fn new() -> Self {
        let mut root = Action::new(ROOT_ACTION, ROOT_GENERATOR, Device::default());
        root.overridden = true;
        Self {
            actions: vec![root],
            root: 0,
        }
    }

    pub(crate) fn push(&mut self, action: Action) -> ActionId {
        self.actions.push(action);
        self.actions.len() - 1
    }

    pub(crate) fn link(&mut self, parent: ActionId, child: ActionId) {
        self.actions[parent].children.push(child);
    }

    pub fn root(&self) -> ActionId {
        self.root
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id]
    }

    pub fn children(&self, id: ActionId) -> &[ActionId] {
        &self.actions[id].children
    }

    /// Number of actions, not counting the root.
    pub fn action_count(&self) -> usize {
        self.actions.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.action_count() == 0
    }

    /// Every action except the root, in arena order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .enumerate()
            .filter(move |(id, _)| *id != self.root)
            .map(|(_, action)| action)
    }

    /// One chain per device, in dispatch order.
    pub fn chains(&self) -> Vec<Vec<&Action>> {
        self.children(self.root)
            .iter()
            .map(|&head| {
                let mut chain = Vec::new();
                let mut next = Some(head);
                while let Some(id) = next {
                    chain.push(self.action(id));
                    next = self.children(id).first().copied();
                }
                chain
            })
            .collect()
    }
}

impl Default for ExecutionGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_has_only_root() {
        let graph = ExecutionGraph::new();
        assert!(graph.is_empty());
        assert!(graph.action(graph.root()).overridden);
        assert_eq!(graph.action(graph.root()).name, ROOT_ACTION);
        assert!(graph.chains().is_empty());
    }

    #[test]
    fn test_chains_follow_links() {
        let mut graph = ExecutionGraph::new();
        let a = graph.push(Action::new("PowerOn", "PowerOnDefault", Device::new("D1")));
        let b = graph.push(Action::new("ChangeInput", "ChangeVideoInputDefault", Device::new("D1")));
        let c = graph.push(Action::new("PowerOn", "PowerOnDefault", Device::new("D2")));
        graph.link(graph.root(), a);
        graph.link(a, b);
        graph.link(graph.root(), c);

        let names: Vec<Vec<&str>> = graph
            .chains()
            .iter()
            .map(|chain| chain.iter().map(|a| a.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["PowerOn", "ChangeInput"], vec!["PowerOn"]]);
        assert_eq!(graph.action_count(), 3);
        assert_eq!(graph.actions().count(), 3);
    }
}
