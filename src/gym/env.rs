use std::sync::Arc;

use polars::prelude::DataFrame;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    data::{episode::EpisodeWindow, features::MasterTable, series::PriceSeries},
    error::{EnvError, GymResult},
    gym::{
        Env, Reward, Transition,
        action::{ActionSpace, Position},
        config::EnvConfig,
        info::StepInfo,
        observation::{State, StateCols},
    },
    math::returns::{cumulative_product, period_change, scale_reward},
};

/// Single-asset trading environment.
///
/// Each episode is a random window of `episode_len` rows copied from the shared
/// master table. The agent picks a position per row; the environment records it,
/// charges commission on position changes and rewards the change in strategy
/// equity.
///
/// # Lifecycle
///
/// ```md
/// Cursor (`idx`)             | Call        | Result
/// ---------------------------|-------------|----------------------------------------
/// any                        | reset()     | new window, idx = 0, position flat
/// idx < episode_len - 2      | step(a)     | idx + 1, done = false
/// idx == episode_len - 2     | step(a)     | idx + 1, done = true
/// idx == episode_len - 1     | step(a)     | `EnvError::EpisodeExhausted`
/// any                        | step(a > 2) | `EnvError::InvalidAction`
/// ```
///
/// Failed steps leave the episode untouched.
#[derive(Debug, Clone)]
pub struct Environment {
    // === Public (configurable) ===
    cfg: EnvConfig,

    // === Internal only ===
    /// Shared, immutable feature table.
    master: Arc<MasterTable>,

    /// Source of episode start offsets.
    rng: StdRng,

    /// Owned copy of the current episode's rows.
    window: EpisodeWindow,

    /// Row about to be stepped.
    idx: usize,

    /// Position held going into row `idx`.
    previous: Position,
}

impl Environment {
    /// Derives the master table from `series` and starts the first episode.
    pub fn new(series: &PriceSeries, cfg: EnvConfig) -> GymResult<Self> {
        cfg.validate()?;
        let master = MasterTable::build(series, cfg.windows())?;
        Self::from_master(Arc::new(master), cfg)
    }

    /// Builds from a polars frame with `timestamp` and `close` columns.
    pub fn from_df(df: &DataFrame, cfg: EnvConfig) -> GymResult<Self> {
        let series = PriceSeries::try_from(df)?;
        Self::new(&series, cfg)
    }

    /// Starts an environment on an existing master table. The table is shared,
    /// not copied.
    pub fn from_master(master: Arc<MasterTable>, cfg: EnvConfig) -> GymResult<Self> {
        cfg.validate_for(master.len())?;
        if master.windows() != cfg.windows() {
            return Err(EnvError::InvalidConfig(format!(
                "master table was derived with windows {:?}, config requests {:?}",
                master.windows(),
                cfg.windows()
            ))
            .into());
        }

        let rng = match cfg.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let window = EpisodeWindow::sample(&master, 0, cfg.episode_len())?;

        let mut env = Self {
            cfg,
            master,
            rng,
            window,
            idx: 0,
            previous: Position::Flat,
        };
        env.reset()?;
        Ok(env)
    }

    /// Starts a new episode at an explicit master row instead of a random one.
    pub fn reset_at(&mut self, start: usize) -> GymResult<State> {
        self.window = EpisodeWindow::sample(&self.master, start, self.cfg.episode_len())?;
        self.idx = 0;
        self.previous = Position::Flat;

        tracing::info!(
            start,
            first_timestamp = %self.window.timestamps()[0],
            "Episode Starting"
        );
        self.get_state()
    }

    /// State vector at the current row.
    pub fn get_state(&self) -> GymResult<State> {
        self.cfg
            .state_cols()
            .observe(&self.window, self.idx)
            .ok_or_else(|| self.exhausted().into())
    }

    /// Change in strategy equity at the current row, recomputed over the whole window.
    pub fn get_reward(&self) -> Reward {
        let curve = cumulative_product(self.window.strategy_factors());
        Reward::from(scale_reward(period_change(&curve, self.idx)))
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace
    }

    pub fn state_cols(&self) -> &StateCols {
        self.cfg.state_cols()
    }

    pub fn observation_size(&self) -> usize {
        self.cfg.state_cols().len()
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn previous_position(&self) -> Position {
        self.previous
    }

    /// Master row at which the current episode starts.
    pub fn episode_start(&self) -> usize {
        self.window.start()
    }

    /// `true` once the terminal row has been stepped.
    pub fn is_done(&self) -> bool {
        self.idx > self.terminal_idx()
    }

    pub fn master(&self) -> &Arc<MasterTable> {
        &self.master
    }

    pub fn window(&self) -> &EpisodeWindow {
        &self.window
    }

    /// The current episode as a polars frame, including equity curves.
    pub fn episode_frame(&self) -> GymResult<DataFrame> {
        self.window.to_df()
    }

    /// Clone sharing the master table, with its own seed and a fresh episode.
    pub fn fork(&self, seed: u64) -> GymResult<Self> {
        Self::from_master(self.master.clone(), self.cfg.clone().with_seed(seed))
    }
}

impl Env for Environment {
    #[tracing::instrument(skip(self), fields(episode_len = self.cfg.episode_len()))]
    fn reset(&mut self) -> GymResult<State> {
        // Upper bound is exclusive; construction guarantees it is positive.
        let start = self.rng.random_range(0..self.max_start());
        self.reset_at(start)
    }

    fn step(&mut self, action_idx: usize) -> GymResult<Transition> {
        let position = self.check_step(action_idx)?;
        let idx = self.idx;

        let fee = self
            .previous
            .transition_fee(position, self.cfg.commission());
        self.window.record(idx, position.signal(), fee);
        self.previous = position;

        let reward = self.get_reward();
        let done = idx == self.terminal_idx();
        let info = StepInfo::evaluate(&self.window, idx, reward);

        self.idx += 1;

        tracing::debug!(idx, %position, fee, reward = reward.0, done, "Step");
        if done {
            tracing::info!(
                model_returns = info.model_returns,
                hodl_returns = info.hodl_returns,
                mom_returns = info.mom_returns,
                "Episode Done"
            );
        }

        Ok((self.get_state()?, reward, done, info))
    }
}

impl Environment {
    /// Exclusive upper bound of the random start offset.
    fn max_start(&self) -> usize {
        self.master.len() - self.cfg.episode_len()
    }

    /// Last row that can be stepped; its step reports `done`.
    fn terminal_idx(&self) -> usize {
        self.cfg.episode_len() - 2
    }

    /// Validates a step without applying it.
    pub(crate) fn check_step(&self, action_idx: usize) -> GymResult<Position> {
        let position = Position::try_from(action_idx).inspect_err(|_| {
            tracing::warn!(action_idx, "Rejected invalid action");
        })?;

        if self.idx > self.terminal_idx() {
            tracing::warn!(idx = self.idx, "Rejected step on exhausted episode");
            return Err(self.exhausted().into());
        }
        Ok(position)
    }

    fn exhausted(&self) -> EnvError {
        EnvError::EpisodeExhausted {
            idx: self.idx,
            episode_len: self.cfg.episode_len(),
        }
    }
}
