//! Transition graph over the mower's operating states

use moebot_core::{MowerAction, MowerState};
use std::collections::VecDeque;
use std::fmt;

/// Where a transition may be taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Legal from every state
    Any,
    State(MowerState),
}

/// A declared transition: trigger name, source, target and device action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub trigger: &'static str,
    pub source: Source,
    pub target: MowerState,
    pub action: MowerAction,
}

impl Transition {
    pub const fn new(
        trigger: &'static str,
        source: MowerState,
        target: MowerState,
        action: MowerAction,
    ) -> Self {
        Self {
            trigger,
            source: Source::State(source),
            target,
            action,
        }
    }

    /// A transition legal from every state
    pub const fn from_any(trigger: &'static str, target: MowerState, action: MowerAction) -> Self {
        Self {
            trigger,
            source: Source::Any,
            target,
            action,
        }
    }
}

/// A single concrete step of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub trigger: &'static str,
    pub from: MowerState,
    pub to: MowerState,
    pub action: MowerAction,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.trigger, self.from, self.to)
    }
}

/// The MoeBot's transitions, in declaration order
///
/// Order matters: it decides between equally short plans.
pub const MOEBOT_TRANSITIONS: [Transition; 10] = {
    use MowerAction::*;
    use MowerState::*;
    [
        Transition::new("start", Standby, Mowing, Start),
        Transition::new("start", Charging, Mowing, Start),
        Transition::new("continue", Paused, Mowing, Start),
        Transition::new("continue", ChargingWithTaskSuspend, Mowing, Start),
        Transition::new("pause", Mowing, Paused, Pause),
        Transition::new("pause", FixedMowing, Paused, Pause),
        Transition::new("pause", Park, Paused, Pause),
        Transition::new("cancel", Paused, Standby, Cancel),
        Transition::new("cancel", Park, Standby, Cancel),
        Transition::from_any("dock", Park, Dock),
    ]
};

/// Directed graph over [`MowerState`], fixed at construction
///
/// Wildcard transitions are expanded into one edge per state when the graph
/// is built. Each state's outgoing edges keep the declaration order of the
/// transitions they came from.
#[derive(Debug, Clone)]
pub struct TransitionGraph {
    transitions: Vec<Transition>,
    adjacency: Vec<Vec<Edge>>,
}

impl TransitionGraph {
    pub fn new(transitions: impl IntoIterator<Item = Transition>) -> Self {
        let transitions: Vec<Transition> = transitions.into_iter().collect();
        let mut adjacency = vec![Vec::new(); MowerState::ALL.len()];

        for transition in &transitions {
            let edge = |from| Edge {
                trigger: transition.trigger,
                from,
                to: transition.target,
                action: transition.action,
            };
            match transition.source {
                Source::Any => {
                    for from in MowerState::ALL {
                        adjacency[from.index()].push(edge(from));
                    }
                }
                Source::State(from) => adjacency[from.index()].push(edge(from)),
            }
        }

        Self {
            transitions,
            adjacency,
        }
    }

    /// The graph for a MoeBot mower
    pub fn moebot() -> Self {
        Self::new(MOEBOT_TRANSITIONS)
    }

    /// Transitions as declared
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Outgoing edges of a state, in declaration order
    pub fn edges_from(&self, state: MowerState) -> &[Edge] {
        &self.adjacency[state.index()]
    }

    /// Fewest-edges path from `from` to `to`
    ///
    /// Breadth-first with every edge costing 1. A state's predecessor is
    /// fixed the first time the state is discovered, so among equally short
    /// paths the one whose earliest differing edge was declared first wins.
    /// Returns an empty path when `from == to` and `None` when `to` cannot be
    /// reached.
    pub fn shortest_path(&self, from: MowerState, to: MowerState) -> Option<Vec<Edge>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut predecessor: Vec<Option<Edge>> = vec![None; MowerState::ALL.len()];
        let mut visited = vec![false; MowerState::ALL.len()];
        let mut queue = VecDeque::new();

        visited[from.index()] = true;
        queue.push_back(from);

        while let Some(state) = queue.pop_front() {
            for edge in self.edges_from(state) {
                if visited[edge.to.index()] {
                    continue;
                }
                visited[edge.to.index()] = true;
                predecessor[edge.to.index()] = Some(*edge);

                if edge.to == to {
                    return Some(Self::unwind(&predecessor, from, to));
                }
                queue.push_back(edge.to);
            }
        }

        None
    }

    fn unwind(predecessor: &[Option<Edge>], from: MowerState, to: MowerState) -> Vec<Edge> {
        let mut path = Vec::new();
        let mut cursor = to;
        while cursor != from {
            match predecessor[cursor.index()] {
                Some(edge) => {
                    path.push(edge);
                    cursor = edge.from;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

impl Default for TransitionGraph {
    fn default() -> Self {
        Self::moebot()
    }
}
