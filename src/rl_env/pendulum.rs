// Classic pendulum swing-up, same dynamics as gym's Pendulum-v1.

use std::f64::consts::PI;

use burn::config::Config;
use ndarray::{arr1, Array1, ArrayView1};
use rand::Rng;
use rand_distr::Uniform;

use super::env::{Env, StepInfo};
use super::space::Space;
use crate::burn_utils::with_rng;

#[derive(Config, Debug)]
pub struct PendulumConfig {
    #[config(default = "8.0")]
    pub max_speed: f64,
    #[config(default = "2.0")]
    pub max_torque: f64,
    #[config(default = "0.05")]
    pub dt: f64,
    #[config(default = "10.0")]
    pub g: f64,
    #[config(default = "1.0")]
    pub m: f64,
    #[config(default = "1.0")]
    pub l: f64,
}

pub struct Pendulum {
    conf: PendulumConfig,
    theta: f64,
    theta_dot: f64,
}

fn angle_normalize(x: f64) -> f64 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

impl Pendulum {
    pub fn new(conf: PendulumConfig) -> Self {
        Self {
            conf,
            theta: 0.0,
            theta_dot: 0.0,
        }
    }

    pub fn set_state(&mut self, theta: f64, theta_dot: f64) {
        self.theta = theta;
        self.theta_dot = theta_dot;
    }

    fn get_obs(&self) -> Array1<f64> {
        arr1(&[self.theta.cos(), self.theta.sin(), self.theta_dot])
    }
}

impl Env for Pendulum {
    fn observation_space(&self) -> Space {
        let max_speed = self.conf.max_speed;
        Space::fixed_box([-1.0, -1.0, -max_speed], [1.0, 1.0, max_speed])
    }

    fn action_space(&self) -> Space {
        Space::uniform_box(-self.conf.max_torque, self.conf.max_torque, 1)
    }

    fn reset(&mut self) -> anyhow::Result<Array1<f64>> {
        let theta_dist = Uniform::new_inclusive(-PI, PI)?;
        let theta_dot_dist = Uniform::new_inclusive(-1.0, 1.0)?;
        let (theta, theta_dot) =
            with_rng(|rng| (rng.sample(&theta_dist), rng.sample(&theta_dot_dist)));
        self.set_state(theta, theta_dot);
        Ok(self.get_obs())
    }

    fn step(&mut self, action: ArrayView1<f64>) -> anyhow::Result<StepInfo> {
        anyhow::ensure!(action.len() == 1, "pendulum expects 1 action, got {}", action.len());
        let conf = &self.conf;
        let u = action[0].clamp(-conf.max_torque, conf.max_torque);
        let costs = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * u.powi(2);

        let new_theta_dot = (self.theta_dot
            + (3.0 * conf.g / (2.0 * conf.l) * self.theta.sin()
                + 3.0 / (conf.m * conf.l * conf.l) * u)
                * conf.dt)
            .clamp(-conf.max_speed, conf.max_speed);
        self.theta += new_theta_dot * conf.dt;
        self.theta_dot = new_theta_dot;

        Ok(StepInfo::scalar(self.get_obs(), -costs, false))
    }
}
