//! Command-driven motion model.
//!
//! Turning commands rotate every heading vector by one bin. A forward command
//! shifts confidence toward the neighbouring location the camera is facing,
//! weighted by how sideways the current best heading is.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::decision::decide;
use super::types::{Belief, Generation};

/// Discrete movement command recorded for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Command {
    Left,
    Right,
    Forward,
    /// No movement. Unrecognized codes map here.
    #[default]
    Stay,
}

impl Command {
    /// Map a command-log code to a command. Anything unknown is a no-op.
    pub fn from_code(code: char) -> Self {
        match code {
            'l' => Command::Left,
            'r' => Command::Right,
            'f' => Command::Forward,
            _ => Command::Stay,
        }
    }

    pub fn code(self) -> char {
        match self {
            Command::Left => 'l',
            Command::Right => 'r',
            Command::Forward => 'f',
            Command::Stay => 's',
        }
    }
}

/// Motion model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionModel {
    /// Scale of the forward confidence boost. A gain below -1 scales the
    /// neighbour to zero rather than negative.
    pub forward_gain: f64,
    /// Angle covered by one heading bin, in degrees.
    pub degrees_per_bin: f64,
}

impl Default for MotionModel {
    fn default() -> Self {
        Self {
            forward_gain: 0.05,
            degrees_per_bin: 15.0,
        }
    }
}

impl MotionModel {
    /// Apply `command` to `previous`, returning a new generation.
    pub fn apply(&self, previous: &Generation, command: Command) -> Generation {
        match command {
            Command::Left => map_headings(previous, rotate_left),
            Command::Right => map_headings(previous, rotate_right),
            Command::Forward => self.advance(previous),
            Command::Stay => previous.clone(),
        }
    }

    /// Boost applied to the neighbouring location for a given heading bin.
    pub fn forward_boost(&self, heading: usize) -> f64 {
        let angle = heading as f64 * self.degrees_per_bin;
        self.forward_gain * angle.to_radians().sin().abs()
    }

    fn advance(&self, previous: &Generation) -> Generation {
        let best = decide(previous);
        let angle = best.heading as f64 * self.degrees_per_bin;
        let factor = (1.0 + self.forward_boost(best.heading)).max(0.0);

        let target = if angle < 180.0 && best.location + 1 < previous.num_locations() {
            Some(best.location + 1)
        } else if angle > 180.0 && angle < 360.0 && best.location > 0 {
            Some(best.location - 1)
        } else {
            None
        };

        let Some(target) = target else {
            return previous.clone();
        };

        let beliefs = previous
            .iter()
            .enumerate()
            .map(|(idx, b)| {
                if idx == target {
                    Belief::from_parts(b.confidence() * factor, b.headings().clone())
                } else {
                    b.clone()
                }
            })
            .collect();
        Generation::from_beliefs_unchecked(beliefs, previous.num_bins())
    }
}

fn map_headings(
    generation: &Generation,
    rotate: impl Fn(&DVector<f64>) -> DVector<f64>,
) -> Generation {
    let beliefs = generation
        .iter()
        .map(|b| Belief::from_parts(b.confidence(), rotate(b.headings())))
        .collect();
    Generation::from_beliefs_unchecked(beliefs, generation.num_bins())
}

/// First entry moves to the end.
pub fn rotate_left(headings: &DVector<f64>) -> DVector<f64> {
    let n = headings.len();
    if n == 0 {
        return headings.clone();
    }
    DVector::from_fn(n, |i, _| headings[(i + 1) % n])
}

/// Last entry moves to the front.
pub fn rotate_right(headings: &DVector<f64>) -> DVector<f64> {
    let n = headings.len();
    if n == 0 {
        return headings.clone();
    }
    DVector::from_fn(n, |i, _| headings[(i + n - 1) % n])
}
