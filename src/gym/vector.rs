use std::sync::Arc;

use rayon::iter::{
    IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator,
};

use crate::{
    data::features::MasterTable,
    error::{EnvError, GymResult},
    gym::{Env, Transition, config::EnvConfig, env::Environment, observation::State},
};

/// Independent environments over one shared master table, driven in parallel.
///
/// Each environment owns its episode window, cursor and RNG; only the master
/// table is shared. Environment `i` is seeded with `base_seed + i`.
#[derive(Debug, Clone)]
pub struct VecEnv {
    envs: Vec<Environment>,
}

impl VecEnv {
    pub fn new(
        master: Arc<MasterTable>,
        cfg: EnvConfig,
        num_envs: usize,
        base_seed: u64,
    ) -> GymResult<Self> {
        if num_envs == 0 {
            return Err(
                EnvError::InvalidConfig("VecEnv needs at least one environment".to_string()).into(),
            );
        }

        let envs = (0..num_envs as u64)
            .map(|i| {
                let cfg = cfg.clone().with_seed(base_seed.wrapping_add(i));
                Environment::from_master(master.clone(), cfg)
            })
            .collect::<GymResult<Vec<_>>>()?;

        tracing::debug!(num_envs, base_seed, "Built vectorized environment");
        Ok(Self { envs })
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn envs(&self) -> &[Environment] {
        &self.envs
    }

    pub fn get(&self, i: usize) -> Option<&Environment> {
        self.envs.get(i)
    }

    /// Resets every environment and returns the initial states in order.
    pub fn reset_all(&mut self) -> GymResult<Vec<State>> {
        self.envs.par_iter_mut().map(Env::reset).collect()
    }

    /// Steps environment `i` with `actions[i]`.
    ///
    /// The slice length, every action and every cursor are checked before any
    /// environment is stepped, so a rejected call leaves all environments untouched.
    pub fn step_all(&mut self, actions: &[usize]) -> GymResult<Vec<Transition>> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::ActionCountMismatch {
                actions: actions.len(),
                envs: self.envs.len(),
            }
            .into());
        }
        for (env, &a) in self.envs.iter().zip(actions) {
            env.check_step(a)?;
        }

        self.envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(env, &a)| env.step(a))
            .collect()
    }
}
