// Cart-pole balancing, same dynamics as gym's CartPole-v1.

use burn::config::Config;
use ndarray::{arr1, Array1, ArrayView1};
use rand::Rng;
use rand_distr::Uniform;

use super::env::{Env, StepInfo};
use super::space::Space;
use crate::burn_utils::with_rng;

#[derive(Config, Debug)]
pub struct CartPoleConfig {
    #[config(default = "9.8")]
    pub gravity: f64,
    #[config(default = "1.0")]
    pub mass_cart: f64,
    #[config(default = "0.1")]
    pub mass_pole: f64,
    /// Half the pole length.
    #[config(default = "0.5")]
    pub length: f64,
    #[config(default = "10.0")]
    pub force_mag: f64,
    #[config(default = "0.02")]
    pub tau: f64,
    #[config(default = "0.20943951023931953")]
    pub theta_threshold: f64,
    #[config(default = "2.4")]
    pub x_threshold: f64,
}

pub struct CartPole {
    conf: CartPoleConfig,
    state: [f64; 4],
    terminated: bool,
}

impl CartPole {
    pub fn new(conf: CartPoleConfig) -> Self {
        Self {
            conf,
            state: [0.0; 4],
            terminated: false,
        }
    }

    pub fn set_state(&mut self, state: [f64; 4]) {
        self.state = state;
        self.terminated = false;
    }

    fn get_obs(&self) -> Array1<f64> {
        arr1(&self.state)
    }
}

impl Env for CartPole {
    fn observation_space(&self) -> Space {
        let high = [
            self.conf.x_threshold * 2.0,
            f64::MAX,
            self.conf.theta_threshold * 2.0,
            f64::MAX,
        ];
        Space::fixed_box(high.map(|x| -x), high)
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 2 }
    }

    fn reset(&mut self) -> anyhow::Result<Array1<f64>> {
        let dist = Uniform::new_inclusive(-0.05, 0.05)?;
        let state = with_rng(|rng| [0; 4].map(|_| rng.sample(&dist)));
        self.set_state(state);
        Ok(self.get_obs())
    }

    fn step(&mut self, action: ArrayView1<f64>) -> anyhow::Result<StepInfo> {
        anyhow::ensure!(
            self.action_space().contains(action.as_slice().unwrap_or(&[f64::NAN])),
            "invalid cart-pole action {}",
            action
        );
        if self.terminated {
            return Ok(StepInfo::scalar(self.get_obs(), 0.0, true));
        }
        let conf = &self.conf;
        let [x, x_dot, theta, theta_dot] = self.state;
        let force = if action[0] == 1.0 {
            conf.force_mag
        } else {
            -conf.force_mag
        };
        let total_mass = conf.mass_cart + conf.mass_pole;
        let pole_mass_length = conf.mass_pole * conf.length;
        let (sin_theta, cos_theta) = theta.sin_cos();

        let temp = (force + pole_mass_length * theta_dot * theta_dot * sin_theta) / total_mass;
        let theta_acc = (conf.gravity * sin_theta - cos_theta * temp)
            / (conf.length * (4.0 / 3.0 - conf.mass_pole * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        // explicit euler
        self.state = [
            x + conf.tau * x_dot,
            x_dot + conf.tau * x_acc,
            theta + conf.tau * theta_dot,
            theta_dot + conf.tau * theta_acc,
        ];
        self.terminated = self.state[0].abs() > conf.x_threshold
            || self.state[2].abs() > conf.theta_threshold;

        Ok(StepInfo::scalar(self.get_obs(), 1.0, self.terminated))
    }
}
