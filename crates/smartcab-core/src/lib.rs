//! Core types and collaborator contracts for the smartcab learning agent.
//!
//! The agent itself lives in `smartcab-learner`. This crate holds what the
//! agent and its collaborators share: the action domain, the perceived
//! [`State`], the per-step [`StepRecord`] and the traits through which the
//! simulated world is queried.

pub mod error;
pub mod state;
pub mod step;

pub use error::DomainError;
pub use state::{Action, Light, Location, Perception, RawPerception, State, ACTION_COUNT};
pub use step::StepRecord;

/// The simulated world as seen by the agent.
pub trait Environment {
    /// Fixed, ordered action domain. Must equal [`Action::ALL`].
    fn valid_actions(&self) -> &[Action];
    /// Current local perception of the agent.
    fn sense(&self) -> Perception;
    /// Remaining timesteps of the running trial (may go negative when the
    /// deadline is not enforced).
    fn deadline(&self) -> i64;
    /// Executes `action`, advances the world by one timestep and returns the reward.
    fn act(&mut self, action: Action) -> f64;
}

/// Directional oracle that knows the way to the current destination.
pub trait RoutePlanner {
    fn route_to(&mut self, destination: Option<Location>);
    fn next_waypoint(&self) -> Action;
}

/// Learning agent driven by an external simulation loop.
///
/// The loop calls [`Agent::reset`] once per trial and then [`Agent::update`]
/// once per timestep until it observes the end of the trial.
pub trait Agent {
    type Error: std::error::Error + Send + Sync + 'static;

    fn reset(&mut self, planner: &mut dyn RoutePlanner, destination: Option<Location>);
    fn update(
        &mut self,
        env: &mut dyn Environment,
        planner: &dyn RoutePlanner,
    ) -> Result<StepRecord, Self::Error>;
}
