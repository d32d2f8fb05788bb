use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{EnvError, GymResult};

/// Position held over one period.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    EnumCount,
    Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    /// Signed exposure written to the `signal` column.
    pub fn signal(&self) -> f64 {
        match self {
            Self::Short => -1.0,
            Self::Flat => 0.0,
            Self::Long => 1.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }

    /// Index of this position in the action space.
    pub fn index(&self) -> usize {
        match self {
            Self::Short => 0,
            Self::Flat => 1,
            Self::Long => 2,
        }
    }

    /// Commission multiple charged when moving from `self` to `next`.
    ///
    /// ```md
    /// From      | To                 | Multiple
    /// ----------|--------------------|---------
    /// Flat      | Short / Long       | 1 (entry)
    /// Long      | Short, or reverse  | 2 (exit + entry)
    /// any       | same position      | 0
    /// Long/Short| Flat               | 0
    /// ```
    pub fn fee_multiple(&self, next: Position) -> f64 {
        use Position::*;
        match (*self, next) {
            (Flat, Short | Long) => 1.0,
            (Long, Short) | (Short, Long) => 2.0,
            _ => 0.0,
        }
    }

    /// Commission charged for the transition at `rate` per side.
    pub fn transition_fee(&self, next: Position, rate: f64) -> f64 {
        self.fee_multiple(next) * rate
    }
}

impl TryFrom<usize> for Position {
    type Error = EnvError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Position::iter()
            .nth(index)
            .ok_or(EnvError::InvalidAction(index))
    }
}

/// The ordered discrete action set `[short, flat, long]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionSpace;

impl ActionSpace {
    pub fn len(&self) -> usize {
        Position::COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> {
        Position::iter()
    }

    /// Signed values in index order: `[-1, 0, 1]`.
    pub fn values(&self) -> [f64; Position::COUNT] {
        [
            Position::Short.signal(),
            Position::Flat.signal(),
            Position::Long.signal(),
        ]
    }

    pub fn get(&self, index: usize) -> GymResult<Position> {
        Ok(Position::try_from(index)?)
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len()
    }

    /// Uniformly random action index.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.random_range(0..self.len())
    }
}
