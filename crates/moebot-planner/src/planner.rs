//! Recorded state and serialized plan execution

use moebot_core::{MowerState, UnrecognizedState};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::control::MowerControl;
use crate::error::{PlannerError, PlannerResult};
use crate::graph::{Edge, TransitionGraph};

/// Drives one mower towards requested states
///
/// The recorded state is written only by [`MowerPlanner::record_state`],
/// which the device listener calls on every push. [`MowerPlanner::drive_to`]
/// holds an execution lock for its whole run, so overlapping requests queue
/// up and their device actions never interleave.
pub struct MowerPlanner {
    graph: TransitionGraph,
    control: Arc<dyn MowerControl>,
    /// Recorded state; the channel serializes writers
    state: watch::Sender<MowerState>,
    /// Held for the full duration of a plan
    execution: Mutex<()>,
}

impl MowerPlanner {
    /// Create a planner over the MoeBot transition graph, starting in Standby
    pub fn new(control: Arc<dyn MowerControl>) -> Self {
        Self::with_graph(TransitionGraph::moebot(), control)
    }

    pub fn with_graph(graph: TransitionGraph, control: Arc<dyn MowerControl>) -> Self {
        let (state, _) = watch::channel(MowerState::default());
        Self {
            graph,
            control,
            state,
            execution: Mutex::new(()),
        }
    }

    pub fn graph(&self) -> &TransitionGraph {
        &self.graph
    }

    /// The last state reported by the device
    pub fn current_state(&self) -> MowerState {
        *self.state.borrow()
    }

    /// Observe every recorded state change
    pub fn watch(&self) -> watch::Receiver<MowerState> {
        self.state.subscribe()
    }

    /// Overwrite the recorded state
    pub fn record_state(&self, state: MowerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Recorded mower state");
        }
    }

    /// Parse a raw device state and record it
    ///
    /// Unknown strings leave the recorded state untouched.
    pub fn record_raw(&self, raw: &str) -> PlannerResult<MowerState> {
        let state: MowerState = raw.parse().map_err(|e: UnrecognizedState| {
            warn!(state = raw, "Device reported an unrecognized state");
            PlannerError::from(e)
        })?;
        self.record_state(state);
        Ok(state)
    }

    /// Shortest plan from the recorded state to `target`, without running it
    pub fn plan(&self, target: MowerState) -> PlannerResult<Vec<Edge>> {
        let from = self.current_state();
        self.graph
            .shortest_path(from, target)
            .ok_or(PlannerError::Unreachable { from, to: target })
    }

    /// Run the shortest plan from the recorded state to `target`
    ///
    /// Each step's action is awaited before the next starts. The first
    /// failure aborts the plan; earlier steps are not rolled back. Returns
    /// the steps that were executed. The recorded state is not touched: the
    /// device's own notifications move it.
    pub async fn drive_to(&self, target: MowerState) -> PlannerResult<Vec<Edge>> {
        self.drive_to_if(target, |_| true).await
    }

    /// Like [`MowerPlanner::drive_to`], but only runs the plan if `accept`
    /// approves it
    ///
    /// The plan is derived and checked under the execution lock, so the
    /// approved plan is the one that runs. A refused plan performs no
    /// actions and fails with [`PlannerError::Rejected`].
    #[instrument(skip(self, accept), fields(target = %target))]
    pub async fn drive_to_if<F>(&self, target: MowerState, accept: F) -> PlannerResult<Vec<Edge>>
    where
        F: FnOnce(&[Edge]) -> bool + Send,
    {
        let _guard = self.execution.lock().await;

        let plan = self.plan(target)?;
        if !accept(&plan) {
            let from = self.current_state();
            debug!(%from, steps = plan.len(), "Plan refused");
            return Err(PlannerError::Rejected { from, to: target });
        }
        if plan.is_empty() {
            debug!("Already in target state");
            return Ok(plan);
        }

        for edge in &plan {
            debug!(step = %edge, action = %edge.action, "Executing transition");
            if let Err(cause) = self.control.perform(edge.action).await {
                warn!(step = %edge, error = %cause, "Transition action failed");
                return Err(PlannerError::ActionFailed { edge: *edge, cause });
            }
        }

        info!(steps = plan.len(), "Plan executed");
        Ok(plan)
    }
}

impl std::fmt::Debug for MowerPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MowerPlanner")
            .field("state", &self.current_state())
            .field("transitions", &self.graph.transitions().len())
            .finish()
    }
}
