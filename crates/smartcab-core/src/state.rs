//! Action domain, perception records and the canonical [`State`] key.
//!
//! Perception arrives from the environment either already typed
//! ([`Perception`]) or as raw symbols ([`RawPerception`]), e.g. when it is
//! read from JSON. Raw symbols are checked against their domain once, at the
//! boundary; everything past it works with the closed enums.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of actions in the action domain.
pub const ACTION_COUNT: usize = 4;

/// One of the four moves the cab can make. `None` also stands for "no
/// traffic" in the oncoming/left/right fields and for "already there" in
/// the planner's waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Option<String>", into = "&'static str")]
pub enum Action {
    None,
    Forward,
    Left,
    Right,
}

impl Action {
    /// The action domain in index order.
    pub const ALL: [Action; ACTION_COUNT] =
        [Action::None, Action::Forward, Action::Left, Action::Right];

    /// Position of the action in [`Action::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Action::None => 0,
            Action::Forward => 1,
            Action::Left => 2,
            Action::Right => 3,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::None => "none",
            Action::Forward => "forward",
            Action::Left => "left",
            Action::Right => "right",
        }
    }

    /// Parses an optional symbol; a missing symbol means [`Action::None`].
    pub fn from_symbol(symbol: Option<&str>) -> Result<Self, DomainError> {
        symbol.map_or(Ok(Action::None), str::parse::<Action>)
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Action::None),
            "forward" => Ok(Action::Forward),
            "left" => Ok(Action::Left),
            "right" => Ok(Action::Right),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

impl TryFrom<Option<String>> for Action {
    type Error = DomainError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        Action::from_symbol(value.as_deref())
    }
}

impl From<Action> for &'static str {
    fn from(action: Action) -> Self {
        action.as_str()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic signal color at the cab's intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Light {
    Red,
    Green,
}

impl Light {
    pub const ALL: [Light; 2] = [Light::Red, Light::Green];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Light::Red => 0,
            Light::Green => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Light::Red => "red",
            Light::Green => "green",
        }
    }
}

impl FromStr for Light {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(Light::Red),
            "green" => Ok(Light::Green),
            other => Err(DomainError::UnknownLight(other.to_string())),
        }
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local perception reported by the environment's `sense`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPerception", into = "RawPerception")]
pub struct Perception {
    pub light: Light,
    pub oncoming: Action,
    pub left: Action,
    pub right: Action,
}

/// Perception as plain symbols. `null`/missing traffic fields mean no traffic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawPerception {
    pub light: String,
    #[serde(default)]
    pub oncoming: Option<String>,
    #[serde(default)]
    pub left: Option<String>,
    #[serde(default)]
    pub right: Option<String>,
}

impl TryFrom<RawPerception> for Perception {
    type Error = DomainError;

    fn try_from(raw: RawPerception) -> Result<Self, Self::Error> {
        Ok(Perception {
            light: raw.light.parse()?,
            oncoming: Action::from_symbol(raw.oncoming.as_deref())?,
            left: Action::from_symbol(raw.left.as_deref())?,
            right: Action::from_symbol(raw.right.as_deref())?,
        })
    }
}

impl From<Perception> for RawPerception {
    fn from(p: Perception) -> Self {
        let symbol = |a: Action| (a != Action::None).then(|| a.as_str().to_string());
        RawPerception {
            light: p.light.as_str().to_string(),
            oncoming: symbol(p.oncoming),
            left: symbol(p.left),
            right: symbol(p.right),
        }
    }
}

/// Canonical state key: the planner's waypoint plus the perceived traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub waypoint: Action,
    pub light: Light,
    pub oncoming: Action,
    pub left: Action,
    pub right: Action,
}

impl State {
    /// Size of the full state space (4 × 2 × 4 × 4 × 4).
    pub const COUNT: usize =
        ACTION_COUNT * Light::ALL.len() * ACTION_COUNT * ACTION_COUNT * ACTION_COUNT;

    /// Builds the state key from the directional hint and the perception.
    #[must_use]
    pub fn encode(waypoint: Action, inputs: &Perception) -> Self {
        State {
            waypoint,
            light: inputs.light,
            oncoming: inputs.oncoming,
            left: inputs.left,
            right: inputs.right,
        }
    }

    /// Dense index in `0..State::COUNT`.
    #[must_use]
    pub fn index(&self) -> usize {
        let mut idx = self.waypoint.index();
        idx = idx * Light::ALL.len() + self.light.index();
        idx = idx * ACTION_COUNT + self.oncoming.index();
        idx = idx * ACTION_COUNT + self.left.index();
        idx * ACTION_COUNT + self.right.index()
    }

    /// Inverse of [`State::index`].
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::COUNT {
            return None;
        }
        let right = index % ACTION_COUNT;
        let rest = index / ACTION_COUNT;
        let left = rest % ACTION_COUNT;
        let rest = rest / ACTION_COUNT;
        let oncoming = rest % ACTION_COUNT;
        let rest = rest / ACTION_COUNT;
        let light = rest % Light::ALL.len();
        let waypoint = rest / Light::ALL.len();
        Some(State {
            waypoint: Action::ALL[waypoint],
            light: Light::ALL[light],
            oncoming: Action::ALL[oncoming],
            left: Action::ALL[left],
            right: Action::ALL[right],
        })
    }

    /// Every state, as the Cartesian product of the five field domains.
    pub fn all() -> impl Iterator<Item = State> {
        Action::ALL.into_iter().flat_map(|waypoint| {
            Light::ALL.into_iter().flat_map(move |light| {
                Action::ALL.into_iter().flat_map(move |oncoming| {
                    Action::ALL.into_iter().flat_map(move |left| {
                        Action::ALL.into_iter().map(move |right| State {
                            waypoint,
                            light,
                            oncoming,
                            left,
                            right,
                        })
                    })
                })
            })
        })
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.waypoint, self.light, self.oncoming, self.left, self.right
        )
    }
}

/// Grid intersection used as a trip destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location(pub i32, pub i32);
