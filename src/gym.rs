use serde::{Deserialize, Serialize};

use crate::{
    error::GymResult,
    gym::{info::StepInfo, observation::State},
    impl_add_sum, impl_from_primitive,
};

pub mod action;
pub mod config;
pub mod env;
pub mod info;
pub mod observation;
pub mod vector;

/// Scaled period reward: the change in strategy equity times 1000, rounded to
/// six decimal places.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Reward(pub f64);
impl_from_primitive!(Reward, f64);
impl_add_sum!(Reward, f64);

/// The result of a single `step`: next state, reward, terminal flag and diagnostics.
pub type Transition = (State, Reward, bool, StepInfo);

/// Gym-style interface of a discrete-action environment.
pub trait Env {
    /// Starts a new episode and returns the initial state.
    fn reset(&mut self) -> GymResult<State>;

    /// Applies the action at `action_idx` to the current row and advances one row.
    fn step(&mut self, action_idx: usize) -> GymResult<Transition>;
}
