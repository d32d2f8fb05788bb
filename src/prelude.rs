// 1. Traits
pub use crate::gym::Env;

// 2. The Core "Loop" Types
pub use crate::gym::{
    Reward, Transition,
    action::{ActionSpace, Position},
    config::EnvConfig,
    env::Environment,
    info::StepInfo,
    observation::{State, StateCols},
    vector::VecEnv,
};

// 3. Data
pub use crate::data::{
    column::{FeatureCol, SeriesCol},
    episode::EpisodeWindow,
    features::{FeatureWindows, MasterTable},
    series::{PriceRecord, PriceSeries},
};

// 4. Errors
pub use crate::error::{DataError, EnvError, GymError, GymResult, IoError};
