//! Scripted environment: replays recorded timesteps from a JSONL file.
//!
//! Each line is one timestep of one trial. Consecutive lines with the same
//! `trial` number form a trial. The environment and the route planner of a
//! trial share one cursor into the script, the way a real planner reads the
//! cab's position from the world. Once the cursor runs past the last line of
//! the trial, both keep reporting that last line.

use anyhow::{Context, Result};
use serde::Deserialize;
use smartcab_core::{Action, Environment, Location, Perception, RoutePlanner};
use std::cell::Cell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    pub trial: u64,
    pub waypoint: Action,
    pub deadline: i64,
    pub inputs: Perception,
    #[serde(default)]
    pub rewards: Rewards,
    #[serde(default)]
    pub destination: Option<Location>,
    /// Executing this step reaches the destination.
    #[serde(default)]
    pub reached: bool,
}

/// Reward per action; missing entries earn nothing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rewards {
    pub none: f64,
    pub forward: f64,
    pub left: f64,
    pub right: f64,
}

impl Rewards {
    #[must_use]
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::None => self.none,
            Action::Forward => self.forward,
            Action::Left => self.left,
            Action::Right => self.right,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    steps: Rc<[ScriptStep]>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path)
            .with_context(|| format!("Failed to open script {}", path.display()))?;
        Self::parse(BufReader::new(f))
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut steps = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let step: ScriptStep = serde_json::from_str(&line)
                .with_context(|| format!("Invalid step on line {}", idx + 1))?;
            steps.push(step);
        }
        if steps.is_empty() {
            anyhow::bail!("Script contains no steps");
        }
        Ok(Self {
            steps: steps.into(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Line ranges of the trials, in script order.
    #[must_use]
    pub fn trials(&self) -> Vec<Range<usize>> {
        let len = self.steps.len();
        let mut ranges = Vec::new();
        let mut start = 0;
        for i in 1..=len {
            if i == len || self.steps[i].trial != self.steps[start].trial {
                ranges.push(start..i);
                start = i;
            }
        }
        ranges
    }

    /// Destination announced on the first line of a trial.
    #[must_use]
    pub fn destination(&self, range: &Range<usize>) -> Option<Location> {
        self.steps.get(range.start).and_then(|s| s.destination)
    }

    /// Environment and planner replaying the lines in `range`.
    #[must_use]
    pub fn world(&self, range: Range<usize>) -> (ScriptedEnvironment, ScriptedPlanner) {
        let cursor = Rc::new(Cell::new(range.start));
        let view = Replay {
            steps: Rc::clone(&self.steps),
            cursor,
            range,
        };
        (
            ScriptedEnvironment {
                view: view.clone(),
                reached: false,
            },
            ScriptedPlanner {
                view,
                destination: None,
            },
        )
    }
}

#[derive(Debug, Clone)]
struct Replay {
    steps: Rc<[ScriptStep]>,
    cursor: Rc<Cell<usize>>,
    range: Range<usize>,
}

impl Replay {
    fn current(&self) -> &ScriptStep {
        let i = self.cursor.get().min(self.range.end - 1);
        &self.steps[i]
    }

    fn exhausted(&self) -> bool {
        self.cursor.get() >= self.range.end
    }
}

#[derive(Debug)]
pub struct ScriptedEnvironment {
    view: Replay,
    reached: bool,
}

impl ScriptedEnvironment {
    /// The trial is over: destination reached or script lines used up.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.reached || self.view.exhausted()
    }

    #[must_use]
    pub fn reached(&self) -> bool {
        self.reached
    }
}

impl Environment for ScriptedEnvironment {
    fn valid_actions(&self) -> &[Action] {
        &Action::ALL
    }

    fn sense(&self) -> Perception {
        self.view.current().inputs
    }

    fn deadline(&self) -> i64 {
        self.view.current().deadline
    }

    fn act(&mut self, action: Action) -> f64 {
        if self.view.exhausted() {
            return 0.0;
        }
        let step = self.view.current();
        let reward = step.rewards.get(action);
        self.reached |= step.reached;
        self.view.cursor.set(self.view.cursor.get() + 1);
        reward
    }
}

#[derive(Debug)]
pub struct ScriptedPlanner {
    view: Replay,
    destination: Option<Location>,
}

impl ScriptedPlanner {
    #[cfg(test)]
    #[must_use]
    pub fn destination(&self) -> Option<Location> {
        self.destination
    }
}

impl RoutePlanner for ScriptedPlanner {
    fn route_to(&mut self, destination: Option<Location>) {
        self.destination = destination;
    }

    fn next_waypoint(&self) -> Action {
        self.view.current().waypoint
    }
}
