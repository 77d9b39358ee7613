use std::collections::VecDeque;

use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, warn};

use crate::{
    AgentId, TaskId,
    action::{Action, PlannedStep},
    config::MAX_BRANCHING_DIAGONALS,
    environment::EnvironmentView,
    goals::{enumerate_goals, stash_route},
    pathfinding::{NavGraph, Route},
    selector::{fallback_step, select_goal},
    synthesis::synthesize,
};

/// What an agent intends to do, first step first.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Task being worked on; `None` for idle fallbacks.
    pub task: Option<TaskId>,
    /// Never empty. Only the first step is executed this tick.
    pub steps: Vec<PlannedStep>,
    /// Expected reward of the decision as scored by the planner.
    pub reward: f64,
}

impl Decision {
    pub fn idle(step: PlannedStep, reward: f64) -> Self {
        Decision {
            task: None,
            steps: vec![step],
            reward,
        }
    }

    pub fn first_step(&self) -> PlannedStep {
        self.steps.first().copied().unwrap_or_else(PlannedStep::stay)
    }
}

/// Trait defining the behavior of an agent.
/// Agents decide what to do based on the EnvironmentView.
pub trait Agent {
    /// Returns the unique ID of this agent.
    fn id(&self) -> AgentId;

    /// Plans against the current world. `&mut self` lets an agent keep
    /// internal state such as its random number generator.
    fn decide(&mut self, view: &EnvironmentView) -> Decision;
}

/// An agent that scores every outstanding task, picks one by softmax and
/// walks an obstacle-free decomposition of the route to it.
#[derive(Debug)]
pub struct PlanningAgent {
    id: AgentId,
    rng: StdRng,
}

impl PlanningAgent {
    pub fn new(id: AgentId, seed: u64) -> Self {
        Self {
            id,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Movement steps along `route`, then `interaction`.
    fn plan_steps(
        &mut self,
        view: &EnvironmentView,
        nav: &NavGraph,
        route: &Route,
        interaction: PlannedStep,
    ) -> Vec<PlannedStep> {
        let raw = route.actions();
        let moves = if raw.is_empty() {
            raw
        } else {
            synthesize(
                nav,
                view.agent.location,
                &raw,
                view.config.max_branching_diagonals.min(MAX_BRANCHING_DIAGONALS),
                &mut self.rng,
            )
            .unwrap_or_else(|err| {
                debug!(agent = self.id, "{}; following the raw route", err);
                raw
            })
        };

        moves
            .into_iter()
            .map(PlannedStep::movement)
            .chain(std::iter::once(interaction))
            .collect()
    }
}

impl Agent for PlanningAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn decide(&mut self, view: &EnvironmentView) -> Decision {
        let nav = NavGraph::for_agent(view.layout, view.world, self.id);
        let goals = enumerate_goals(view, &nav);

        if let Some(goal) = select_goal(&goals, view.config.softmax_beta, &mut self.rng) {
            let goal = goal.clone();
            debug!(agent = self.id, task = goal.task, action = %goal.action, target = %goal.target, "selected goal");
            let interaction = PlannedStep::interact(goal.action, goal.target, Some(goal.task));
            let steps = self.plan_steps(view, &nav, &goal.route, interaction);
            return Decision {
                task: Some(goal.task),
                steps,
                reward: goal.reward,
            };
        }

        let location = view.agent.location;
        if let Some((counter, _, route)) = stash_route(view, &nav) {
            debug!(agent = self.id, %counter, "nothing to do with the held item; stashing it");
            let reward = f64::from(view.config.rewards.drop) - f64::from(route.cost);
            let steps = self.plan_steps(view, &nav, &route, PlannedStep::interact(Action::Drop, counter, None));
            return Decision {
                task: None,
                steps,
                reward,
            };
        }
        if view.agent.holding.is_some() {
            warn!(agent = self.id, %location, "no free counter reachable for the held item");
        }

        let step = fallback_step(view.layout, location, |cell| nav.is_walkable(cell), &mut self.rng);
        debug!(agent = self.id, %location, action = %step.action, "no reachable goal");
        Decision::idle(step, f64::from(view.config.rewards.reward(step.action)))
    }
}

/// Replays a fixed list of steps, then stays put. Handy for staging scenarios.
#[derive(Debug)]
pub struct ScriptedAgent {
    id: AgentId,
    script: VecDeque<PlannedStep>,
}

impl ScriptedAgent {
    pub fn new(id: AgentId, script: impl IntoIterator<Item = PlannedStep>) -> Self {
        Self {
            id,
            script: script.into_iter().collect(),
        }
    }
}

impl Agent for ScriptedAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn decide(&mut self, view: &EnvironmentView) -> Decision {
        let step = self.script.pop_front().unwrap_or_else(PlannedStep::stay);
        Decision {
            task: step.task,
            steps: vec![step],
            reward: f64::from(view.config.rewards.reward(step.action)),
        }
    }
}
