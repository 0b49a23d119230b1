//! Ornstein-Uhlenbeck exploration noise.
//!
//! Discretised mean reverting process
//!
//! ```text
//! x_t = x_{t-1} + theta * (mean - x_{t-1}) * dt + sigma * sqrt(dt) * N(0, 1)
//! ```
//!
//! Successive samples are correlated, which suits continuous control better
//! than independent per-step noise. Call [`OuNoise::reset`] at the start of
//! every exploration episode.

use std::fmt;

use burn::config::Config;
use ndarray::{Array, Array1, Dimension, Zip};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

use crate::burn_utils::with_array_rng;
use crate::error::RlError;

pub const DEFAULT_THETA: f64 = 0.15;
pub const DEFAULT_DELTA_T: f64 = 1e-2;

#[derive(Debug, Clone)]
pub struct OuNoise<D: Dimension> {
    mean: Array<f64, D>,
    sigma: f64,
    theta: f64,
    delta_t: f64,
    x_init: Option<Array<f64, D>>,
    x_prev: Array<f64, D>,
}

impl<D: Dimension> OuNoise<D> {
    pub fn new(mean: Array<f64, D>, sigma: f64) -> Self {
        let x_prev = Array::zeros(mean.raw_dim());
        Self {
            mean,
            sigma,
            theta: DEFAULT_THETA,
            delta_t: DEFAULT_DELTA_T,
            x_init: None,
            x_prev,
        }
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_delta_t(mut self, delta_t: f64) -> Self {
        self.delta_t = delta_t;
        self
    }

    /// Starting point used by `reset`; must have the shape of `mean`.
    pub fn with_x_init(mut self, x_init: Array<f64, D>) -> crate::error::Result<Self> {
        if x_init.shape() != self.mean.shape() {
            return Err(RlError::shape_mismatch(
                "ou noise x_init",
                self.mean.shape(),
                x_init.shape(),
            ));
        }
        self.x_init = Some(x_init);
        self.reset();
        Ok(self)
    }

    /// Draws the next value, with `z` taken from the seeded array generator.
    pub fn sample(&mut self) -> Array<f64, D> {
        let z = with_array_rng(|rng| {
            Array::random_using(self.mean.raw_dim(), StandardNormal, rng)
        });
        self.advance(z)
    }

    /// Same as [`OuNoise::sample`] but draws `z` from `rng`.
    pub fn sample_using<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Array<f64, D> {
        let z = Array::random_using(self.mean.raw_dim(), StandardNormal, rng);
        self.advance(z)
    }

    fn advance(&mut self, z: Array<f64, D>) -> Array<f64, D> {
        let drift = self.theta * self.delta_t;
        let diffusion = self.sigma * self.delta_t.sqrt();
        Zip::from(&mut self.x_prev)
            .and(&self.mean)
            .and(&z)
            .for_each(|x, &mean, &z| *x = *x + drift * (mean - *x) + diffusion * z);
        self.x_prev.clone()
    }

    pub fn reset(&mut self) {
        self.x_prev = match &self.x_init {
            Some(x_init) => x_init.clone(),
            None => Array::zeros(self.mean.raw_dim()),
        };
    }

    pub fn mean(&self) -> &Array<f64, D> {
        &self.mean
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn x_prev(&self) -> &Array<f64, D> {
        &self.x_prev
    }
}

impl<D: Dimension> fmt::Display for OuNoise<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrnsteinUhlenbeckActionNoise(mu={}, sigma={})",
            self.mean, self.sigma
        )
    }
}

#[derive(Config, Debug)]
pub struct OuNoiseConfig {
    pub mean: Vec<f64>,
    pub sigma: f64,
    #[config(default = "0.15")]
    pub theta: f64,
    #[config(default = "0.01")]
    pub delta_t: f64,
    pub x_init: Option<Vec<f64>>,
}

impl OuNoiseConfig {
    pub fn init(&self) -> crate::error::Result<OuNoise<ndarray::Ix1>> {
        let noise = OuNoise::new(Array1::from_vec(self.mean.clone()), self.sigma)
            .with_theta(self.theta)
            .with_delta_t(self.delta_t);
        match &self.x_init {
            Some(x_init) => noise.with_x_init(Array1::from_vec(x_init.clone())),
            None => Ok(noise),
        }
    }
}
