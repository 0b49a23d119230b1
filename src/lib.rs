//! Support utilities for reinforcement learning experiments: seeding,
//! environment space probing, Ornstein-Uhlenbeck exploration noise, Polyak
//! target updates and policy evaluation.

pub mod burn_utils;
pub mod error;
pub mod rl_algorithm;
pub mod rl_env;

pub use burn_utils::set_seeds;
pub use error::{Result, RlError};
pub use rl_algorithm::evaluate::{evaluate, EvalConfig, EvalReport, Evaluator};
pub use rl_algorithm::noise::{OuNoise, OuNoiseConfig};
pub use rl_algorithm::polyak::{polyak_average, polyak_average_module};
pub use rl_env::registry::{get_env_spaces, make_env, register_env};
pub use rl_env::space::Space;
