use anyhow::Context;
use log::trace;
use ndarray::{Array1, Array2, Axis};

use super::env::EnvGuard;
use crate::error::{Result, RlError};
use crate::rl_algorithm::policy::Policy;

/// One rollout. Every field has one row per step.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub observation: Array2<f64>,
    pub action: Array2<f64>,
    /// `(steps, reward_dim)`
    pub reward: Array2<f64>,
    pub next_observation: Array2<f64>,
    pub terminal: Array1<bool>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.reward.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Undiscounted return, one entry per objective.
    pub fn total_reward(&self) -> Array1<f64> {
        self.reward.sum_axis(Axis(0))
    }
}

fn stack_rows(context: &str, rows: Vec<Array1<f64>>, dim: usize) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let mut flat = Vec::<f64>::with_capacity(n_rows * dim);
    for row in rows {
        if row.len() != dim {
            return Err(RlError::shape_mismatch(context, &[dim], &[row.len()]));
        }
        flat.extend(row.iter());
    }
    Array2::from_shape_vec((n_rows, dim), flat)
        .map_err(|_| RlError::shape_mismatch(context, &[n_rows, dim], &[n_rows]))
}

/// Drives a policy through episodes of one environment.
pub struct EpisodeRunner {
    env: EnvGuard,
    max_steps: usize,
    obs: Option<Array1<f64>>,
    episodes: usize,
}

impl EpisodeRunner {
    pub fn new(env: EnvGuard, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            obs: None,
            episodes: 0,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    pub fn env(&self) -> &EnvGuard {
        &self.env
    }

    fn ensure_running(&self) -> Result<()> {
        if self.env.is_closed() {
            return Err(RlError::InvalidArgument(format!(
                "episode runner for {} was stopped",
                self.env.id()
            )));
        }
        Ok(())
    }

    /// Clears the trial state and starts a new episode.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_running()?;
        let obs = self.env.reset().context("env reset failed")?;
        self.obs = Some(obs);
        Ok(())
    }

    /// Runs one episode until termination, truncation or `max_steps`.
    ///
    /// With `store == false` only rewards and terminal flags are kept; the
    /// observation and action matrices come back with zero rows.
    pub fn collect<P: Policy + ?Sized>(&mut self, policy: &mut P, store: bool) -> Result<Trajectory> {
        self.ensure_running()?;
        let mut obs = match self.obs.take() {
            Some(obs) => obs,
            None => self.env.reset().context("env reset failed")?,
        };
        let obs_dim = self.env.get_obs_dim();
        let action_dim = self.env.get_action_dim();
        let reward_dim = self.env.reward_dim();

        let mut obs_list = Vec::<Array1<f64>>::new();
        let mut action_list = Vec::<Array1<f64>>::new();
        let mut next_obs_list = Vec::<Array1<f64>>::new();
        let mut reward_list = Vec::<Array1<f64>>::with_capacity(self.max_steps.min(4096));
        let mut terminal_list = Vec::<bool>::with_capacity(self.max_steps.min(4096));

        for t in 0..self.max_steps {
            let action = policy
                .act(&obs)
                .with_context(|| format!("policy failed at step {}", t))?;
            let step_info = self
                .env
                .step(action.view())
                .with_context(|| format!("env {} step {} failed", self.env.id(), t))?;
            let done = step_info.terminated || step_info.truncated;

            reward_list.push(step_info.reward);
            terminal_list.push(step_info.terminated);
            if store {
                obs_list.push(obs);
                action_list.push(action);
                next_obs_list.push(step_info.next_obs.clone());
            }
            obs = step_info.next_obs;
            if done {
                break;
            }
        }
        self.episodes += 1;
        trace!(
            "episode {} on {} finished after {} steps",
            self.episodes,
            self.env.id(),
            reward_list.len()
        );

        Ok(Trajectory {
            observation: stack_rows("observation", obs_list, obs_dim)?,
            action: stack_rows("action", action_list, action_dim)?,
            reward: stack_rows("reward", reward_list, reward_dim)?,
            next_observation: stack_rows("next_observation", next_obs_list, obs_dim)?,
            terminal: Array1::from_vec(terminal_list),
        })
    }

    /// Releases the environment. Later `reset`/`collect` calls fail.
    pub fn stop(&mut self) {
        self.obs = None;
        self.env.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_env::env::tests::ConstRewardEnv;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn zero_policy(_obs: &Array1<f64>) -> anyhow::Result<Array1<f64>> {
        Ok(Array1::zeros(1))
    }

    fn runner(reward: f64, episode_len: usize, max_steps: usize) -> (EpisodeRunner, Arc<AtomicUsize>) {
        let live = Arc::new(AtomicUsize::new(0));
        let env = ConstRewardEnv::new(reward, episode_len, live.clone());
        (
            EpisodeRunner::new(EnvGuard::new("const", Box::new(env)), max_steps),
            live,
        )
    }

    #[test]
    fn test_collect_until_terminal() {
        let (mut runner, _live) = runner(0.5, 4, 100);
        runner.reset().unwrap();
        let traj = runner.collect(&mut zero_policy, true).unwrap();
        assert_eq!(traj.len(), 4);
        assert_eq!(traj.observation.dim(), (4, 1));
        assert_eq!(traj.action.dim(), (4, 1));
        assert_eq!(traj.next_observation.dim(), (4, 1));
        assert_eq!(traj.terminal.to_vec(), vec![false, false, false, true]);
        assert_eq!(traj.total_reward()[0], 2.0);
        // observation t+1 is next_observation t
        assert_eq!(traj.observation[[1, 0]], traj.next_observation[[0, 0]]);
    }

    #[test]
    fn test_collect_respects_max_steps() {
        let (mut runner, _live) = runner(1.0, 100, 7);
        runner.reset().unwrap();
        let traj = runner.collect(&mut zero_policy, false).unwrap();
        assert_eq!(traj.len(), 7);
        assert_eq!(traj.observation.nrows(), 0);
        assert!(traj.terminal.iter().all(|t| !t));
    }

    #[test]
    fn test_policy_error_propagates() {
        let (mut runner, _live) = runner(1.0, 10, 10);
        let mut failing = |_obs: &Array1<f64>| -> anyhow::Result<Array1<f64>> {
            anyhow::bail!("nan in actor output")
        };
        let err = runner.collect(&mut failing, true).unwrap_err();
        assert!(matches!(err, RlError::Rollout(_)));
        assert!(err.to_string().contains("nan in actor output"));
    }

    #[test]
    fn test_stop_releases_env() {
        let (mut runner, live) = runner(1.0, 10, 10);
        assert_eq!(live.load(Ordering::SeqCst), 1);
        runner.stop();
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(matches!(runner.reset(), Err(RlError::InvalidArgument(_))));
        assert!(runner.collect(&mut zero_policy, true).is_err());
    }
}
