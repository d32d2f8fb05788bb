//! Single-asset trading environment for reinforcement learning.
//!
//! A price series is turned once into a master feature table (price changes,
//! buy-and-hold index, moving averages, momentum signal). Every episode copies a
//! random window out of it; the agent steps through the window choosing
//! short, flat or long and is rewarded by the change in strategy equity net of
//! commission.
//!
//! ```no_run
//! # use single_stock_gym::prelude::*;
//! # fn example() -> GymResult<()> {
//! let series = PriceSeries::from_csv("prices.csv")?;
//! let mut env = Environment::new(&series, EnvConfig::default().with_seed(7))?;
//!
//! let mut state = env.reset()?;
//! loop {
//!     let (next, reward, done, info) = env.step(2)?;
//!     state = next;
//!     if done {
//!         println!("{} -> {:?} / {}", info.idx, reward, info.model_returns);
//!         break;
//!     }
//! }
//! # let _ = state;
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod gym;
mod macros;
pub mod math;
pub mod prelude;
