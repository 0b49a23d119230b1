use std::ops::{Deref, DerefMut};

use log::trace;
use ndarray::{arr1, Array1, ArrayView1};

use super::space::Space;

#[derive(Debug, Clone)]
pub struct StepInfo {
    pub next_obs: Array1<f64>,
    /// One entry per objective; single objective environments return a length 1 array.
    pub reward: Array1<f64>,
    pub terminated: bool,
    pub truncated: bool,
}

impl StepInfo {
    pub fn scalar(next_obs: Array1<f64>, reward: f64, terminated: bool) -> Self {
        Self {
            next_obs,
            reward: arr1(&[reward]),
            terminated,
            truncated: false,
        }
    }
}

/// A simulated environment the runner can drive.
///
/// Implementations hold whatever simulator resources they need and must give
/// them back in `close`, which may be called more than once.
pub trait Env: Send {
    fn observation_space(&self) -> Space;

    fn action_space(&self) -> Space;

    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> anyhow::Result<Array1<f64>>;

    fn step(&mut self, action: ArrayView1<f64>) -> anyhow::Result<StepInfo>;

    fn reward_dim(&self) -> usize {
        1
    }

    fn close(&mut self) {}

    fn get_obs_dim(&self) -> usize {
        self.observation_space().flat_dim()
    }

    fn get_action_dim(&self) -> usize {
        self.action_space().flat_dim()
    }
}

/// Owns an environment and closes it when dropped.
pub struct EnvGuard {
    env: Box<dyn Env>,
    id: String,
    closed: bool,
}

impl EnvGuard {
    pub fn new(id: impl Into<String>, env: Box<dyn Env>) -> Self {
        Self {
            env,
            id: id.into(),
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        if !self.closed {
            trace!("closing env {}", self.id);
            self.env.close();
            self.closed = true;
        }
    }
}

impl Deref for EnvGuard {
    type Target = dyn Env;

    fn deref(&self) -> &Self::Target {
        self.env.as_ref()
    }
}

impl DerefMut for EnvGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env.as_mut()
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        self.close();
    }
}
