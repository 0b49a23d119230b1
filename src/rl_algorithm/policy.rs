use std::marker::PhantomData;

use burn::prelude::*;
use burn::tensor::TensorData;
use ndarray::{Array1, ArrayView1, Zip};
use ndarray_rand::rand::Rng;

use crate::burn_utils::{build_mlp, with_array_rng, BurnForwarder, Sequence};
use crate::rl_env::space::Space;

/// Maps an observation to an action.
pub trait Policy {
    fn act(&mut self, obs: &Array1<f64>) -> anyhow::Result<Array1<f64>>;
}

impl<F> Policy for F
where
    F: FnMut(&Array1<f64>) -> anyhow::Result<Array1<f64>>,
{
    fn act(&mut self, obs: &Array1<f64>) -> anyhow::Result<Array1<f64>> {
        self(obs)
    }
}

/// Network that outputs one action row per observation row.
pub trait PolicyNet<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2>;
}

#[derive(Module, Debug)]
pub struct MlpPolicy<B: Backend> {
    net: Sequence<B>,
}

impl<B: Backend> PolicyNet<B> for MlpPolicy<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.net.forward(obs)
    }
}

#[derive(Config, Debug)]
pub struct MlpPolicyConfig {
    observation_dim: usize,
    action_dim: usize,
    #[config(default = "2")]
    n_layers: usize,
    #[config(default = "64")]
    layer_size: usize,
    /// Squash outputs to `[-1, 1]`.
    #[config(default = "true")]
    tanh_output: bool,
}

impl MlpPolicyConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpPolicy<B> {
        let mut net = build_mlp(
            self.observation_dim,
            self.action_dim,
            self.n_layers,
            self.layer_size,
            device,
        );
        if self.tanh_output {
            net.push(BurnForwarder::Tanh(burn::nn::Tanh::new()));
        }
        MlpPolicy { net }
    }
}

/// Drives a [`PolicyNet`] from ndarray observations.
///
/// For a `Box` action space the network output is read as lying in `[-1, 1]`
/// and rescaled to the box bounds; for `Discrete` the argmax is taken.
pub struct NetPolicy<B: Backend, M: PolicyNet<B>> {
    model: M,
    action_space: Space,
    device: B::Device,
    backend: PhantomData<B>,
}

impl<B: Backend, M: PolicyNet<B>> NetPolicy<B, M> {
    pub fn new(model: M, action_space: Space, device: B::Device) -> Self {
        Self {
            model,
            action_space,
            device,
            backend: PhantomData,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }
}

impl<B: Backend, M: PolicyNet<B>> Policy for NetPolicy<B, M> {
    fn act(&mut self, obs: &Array1<f64>) -> anyhow::Result<Array1<f64>> {
        let input = Tensor::<B, 2>::from_data(
            TensorData::new(obs.to_vec(), [1, obs.len()]).convert::<B::FloatElem>(),
            &self.device,
        );
        let output = self.model.forward(input);
        let raw: Array1<f64> = output.into_data().iter::<f64>().collect();
        match &self.action_space {
            Space::Box { low, high, .. } => {
                anyhow::ensure!(
                    raw.len() == low.len(),
                    "policy produced {} actions, action space has {}",
                    raw.len(),
                    low.len()
                );
                let mut action = Array1::<f64>::zeros(raw.len());
                Zip::from(&mut action)
                    .and(&raw)
                    .and(ArrayView1::from(low.as_slice()))
                    .and(ArrayView1::from(high.as_slice()))
                    .for_each(|a, &r, &l, &h| {
                        *a = (l + (r.clamp(-1.0, 1.0) + 1.0) * 0.5 * (h - l)).clamp(l, h)
                    });
                Ok(action)
            }
            Space::Discrete { n } => {
                anyhow::ensure!(
                    raw.len() == *n,
                    "policy produced {} logits for Discrete({})",
                    raw.len(),
                    n
                );
                let best = raw
                    .iter()
                    .enumerate()
                    .fold((0usize, f64::NEG_INFINITY), |best, (i, &v)| {
                        if v > best.1 {
                            (i, v)
                        } else {
                            best
                        }
                    })
                    .0;
                Ok(Array1::from_elem(1, best as f64))
            }
        }
    }
}

/// Uniformly random actions, drawn from the seeded array generator.
pub struct RandomPolicy {
    action_space: Space,
}

impl RandomPolicy {
    pub fn new(action_space: Space) -> Self {
        Self { action_space }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _obs: &Array1<f64>) -> anyhow::Result<Array1<f64>> {
        let action: Array1<f64> = match &self.action_space {
            Space::Box { low, high, .. } => with_array_rng(|rng| {
                low.iter()
                    .zip(high.iter())
                    .map(|(&l, &h)| if l < h { rng.gen_range(l..=h) } else { l })
                    .collect()
            }),
            Space::Discrete { n } => {
                Array1::from_elem(1, with_array_rng(|rng| rng.gen_range(0..*n)) as f64)
            }
        };
        Ok(action)
    }
}
