//! Policy evaluation by repeated rollouts.

use burn::config::Config;
use burn::tensor::backend::Backend;
use log::{debug, info};
use ndarray::{Array1, Array2, Axis};

use super::logger::EpochLogger;
use super::policy::Policy;
use crate::burn_utils::set_seeds;
use crate::error::RlError;
use crate::rl_env::episode_runner::EpisodeRunner;
use crate::rl_env::registry::make_env;

/// Returns of every trial of one evaluation.
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// `(num_trials, reward_dim)`
    pub trial_returns: Array2<f64>,
    pub trial_lengths: Vec<usize>,
}

impl EvalReport {
    pub fn num_trials(&self) -> usize {
        self.trial_returns.nrows()
    }

    /// Mean trial return, one entry per objective.
    pub fn mean_return(&self) -> Array1<f64> {
        self.trial_returns
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.trial_returns.ncols()))
    }

    /// Mean return averaged over objectives; the plain mean return for
    /// single objective environments.
    pub fn average(&self) -> f64 {
        self.mean_return().mean().unwrap_or(0.0)
    }
}

/// Runs `num_trials` episodes of `policy` on a fresh `env_id` instance.
///
/// The environment is closed before returning, whether or not a trial failed.
pub fn evaluate<P: Policy + ?Sized>(
    env_id: &str,
    policy: &mut P,
    num_trials: usize,
    max_steps_per_trial: usize,
) -> crate::error::Result<EvalReport> {
    if num_trials == 0 {
        return Err(RlError::InvalidArgument(
            "num_trials must be at least 1".to_string(),
        ));
    }
    let env = make_env(env_id)?;
    let reward_dim = env.reward_dim();
    let mut runner = EpisodeRunner::new(env, max_steps_per_trial);

    let mut trial_returns = Array2::<f64>::zeros((num_trials, reward_dim));
    let mut trial_lengths = Vec::with_capacity(num_trials);
    for trial in 0..num_trials {
        runner.reset()?;
        let trajectory = runner.collect(policy, true)?;
        let total = trajectory.total_reward();
        debug!(
            "{} trial {}: return {} over {} steps",
            env_id,
            trial,
            total,
            trajectory.len()
        );
        trial_returns.row_mut(trial).assign(&total);
        trial_lengths.push(trajectory.len());
    }
    runner.stop();

    Ok(EvalReport {
        trial_returns,
        trial_lengths,
    })
}

#[derive(Config, Debug)]
pub struct EvalConfig {
    pub env_id: String,
    #[config(default = "10")]
    pub num_eval: usize,
    #[config(default = "1000")]
    pub max_episode_steps: usize,
    /// Reseeds every generator before each evaluation when set.
    pub seed: Option<u64>,
}

/// Evaluates a policy on a fixed schedule and remembers the best result.
pub struct Evaluator {
    config: EvalConfig,
    best_mean_return: Option<f64>,
    history: Vec<(usize, f64)>,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            best_mean_return: None,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn best_mean_return(&self) -> Option<f64> {
        self.best_mean_return
    }

    /// `(iter, mean return)` for every evaluation so far.
    pub fn history(&self) -> &[(usize, f64)] {
        &self.history
    }

    /// Evaluates `policy` at training iteration `iter`. `B` is the backend
    /// reseeded along with the other generators when a seed is configured.
    pub fn evaluate<B: Backend, P: Policy + ?Sized>(
        &mut self,
        policy: &mut P,
        iter: usize,
    ) -> crate::error::Result<EvalReport> {
        set_seeds::<B>(self.config.seed);
        let report = evaluate(
            &self.config.env_id,
            policy,
            self.config.num_eval,
            self.config.max_episode_steps,
        )?;
        let mean_return = report.average();

        EpochLogger::add_scalar(("eval", "mean_return"), mean_return as f32);
        let improved = self.best_mean_return.map_or(true, |best| mean_return > best);
        if improved {
            self.best_mean_return = Some(mean_return);
        }
        self.history.push((iter, mean_return));
        info!(
            "iter {}: {} mean return {:.3} over {} trials{}",
            iter,
            self.config.env_id,
            mean_return,
            report.num_trials(),
            if improved { " (best)" } else { "" }
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_algorithm::logger::tests::logger_guard;
    use crate::rl_env::env::tests::ConstRewardEnv;
    use crate::rl_env::env::{Env, StepInfo};
    use crate::rl_env::space::Space;
    use ndarray::{arr1, ArrayView1};
    use crate::rl_env::registry::register_env;
    use burn::backend::NdArray;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn zero_policy(_obs: &Array1<f64>) -> anyhow::Result<Array1<f64>> {
        Ok(Array1::zeros(1))
    }

    fn register_const(env_id: &str, reward: f64, episode_len: usize, fail_at: Option<usize>) -> Arc<AtomicUsize> {
        let live = Arc::new(AtomicUsize::new(0));
        let counter = live.clone();
        register_env(env_id, move || {
            let mut env = ConstRewardEnv::new(reward, episode_len, counter.clone());
            env.fail_at = fail_at;
            Ok(Box::new(env) as Box<dyn Env>)
        });
        live
    }

    /// Two objective stub paying `[1, -2]` per step for `episode_len` steps.
    struct TwoObjectiveEnv {
        episode_len: usize,
        t: usize,
    }

    impl Env for TwoObjectiveEnv {
        fn observation_space(&self) -> Space {
            Space::uniform_box(0.0, f64::INFINITY, 1)
        }

        fn action_space(&self) -> Space {
            Space::uniform_box(-1.0, 1.0, 1)
        }

        fn reset(&mut self) -> anyhow::Result<Array1<f64>> {
            self.t = 0;
            Ok(arr1(&[0.0]))
        }

        fn step(&mut self, _action: ArrayView1<f64>) -> anyhow::Result<StepInfo> {
            self.t += 1;
            Ok(StepInfo {
                next_obs: arr1(&[self.t as f64]),
                reward: arr1(&[1.0, -2.0]),
                terminated: self.t >= self.episode_len,
                truncated: false,
            })
        }

        fn reward_dim(&self) -> usize {
            2
        }
    }

    fn register_two_objective(env_id: &str, episode_len: usize) {
        register_env(env_id, move || {
            Ok(Box::new(TwoObjectiveEnv { episode_len, t: 0 }) as Box<dyn Env>)
        });
    }

    #[test]
    fn test_single_trial_sums_rewards() {
        let live = register_const("EvalConst-v0", 0.5, 8, None);
        let report = evaluate("EvalConst-v0", &mut zero_policy, 1, 100).unwrap();
        assert_eq!(report.num_trials(), 1);
        assert_eq!(report.average(), 4.0);
        assert_eq!(report.trial_lengths, vec![8]);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_trials_are_averaged() {
        let _live = register_const("EvalConstMulti-v0", 0.5, 8, None);
        let report = evaluate("EvalConstMulti-v0", &mut zero_policy, 3, 100).unwrap();
        assert_eq!(report.num_trials(), 3);
        assert_eq!(report.mean_return()[0], 4.0);
        assert_eq!(report.average(), 4.0);
    }

    #[test]
    fn test_step_limit_truncates() {
        let _live = register_const("EvalConstLong-v0", 1.0, 1000, None);
        let report = evaluate("EvalConstLong-v0", &mut zero_policy, 2, 10).unwrap();
        assert_eq!(report.average(), 10.0);
    }

    #[test]
    fn test_env_failure_aborts_and_releases() {
        let live = register_const("EvalCrash-v0", 1.0, 10, Some(3));
        let err = evaluate("EvalCrash-v0", &mut zero_policy, 2, 100).unwrap_err();
        assert!(matches!(err, RlError::Rollout(_)));
        assert!(err.to_string().contains("simulator crashed"));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_policy_failure_aborts_and_releases() {
        let live = register_const("EvalBadPolicy-v0", 1.0, 10, None);
        let mut calls = 0;
        let mut policy = |_obs: &Array1<f64>| -> anyhow::Result<Array1<f64>> {
            calls += 1;
            if calls > 12 {
                anyhow::bail!("policy diverged");
            }
            Ok(Array1::zeros(1))
        };
        let err = evaluate("EvalBadPolicy-v0", &mut policy, 3, 100).unwrap_err();
        assert!(matches!(err, RlError::Rollout(_)));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_per_objective_returns() {
        register_two_objective("EvalTwoObjective-v0", 3);
        let report = evaluate("EvalTwoObjective-v0", &mut zero_policy, 2, 100).unwrap();
        assert_eq!(report.trial_returns.dim(), (2, 2));
        assert_eq!(report.mean_return(), arr1(&[3.0, -6.0]));
        assert_eq!(report.average(), -1.5);
        assert_eq!(report.trial_lengths, vec![3, 3]);
    }

    #[test]
    fn test_zero_step_limit() {
        register_two_objective("EvalTwoObjectiveZero-v0", 3);
        let report = evaluate("EvalTwoObjectiveZero-v0", &mut zero_policy, 2, 0).unwrap();
        assert_eq!(report.mean_return(), arr1(&[0.0, 0.0]));
        assert_eq!(report.trial_lengths, vec![0, 0]);
    }

    #[test]
    fn test_invalid_id() {
        let err = evaluate("Missing-v0", &mut zero_policy, 1, 10).unwrap_err();
        assert!(matches!(err, RlError::EnvironmentResolution { .. }));
    }

    #[test]
    fn test_zero_trials_rejected() {
        let live = register_const("EvalZero-v0", 1.0, 10, None);
        let err = evaluate("EvalZero-v0", &mut zero_policy, 0, 10).unwrap_err();
        assert!(matches!(err, RlError::InvalidArgument(_)));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_evaluator_tracks_best() {
        let _guard = logger_guard();
        let _live = register_const("EvalPeriodic-v0", 1.0, 5, None);
        let mut evaluator = Evaluator::new(
            EvalConfig::new("EvalPeriodic-v0".to_string())
                .with_num_eval(2)
                .with_max_episode_steps(50),
        );
        assert_eq!(evaluator.best_mean_return(), None);

        let mut scale = 1.0;
        for iter in 0..3 {
            let mut policy = |_obs: &Array1<f64>| -> anyhow::Result<Array1<f64>> {
                Ok(Array1::from_elem(1, scale))
            };
            let report = evaluator.evaluate::<NdArray, _>(&mut policy, iter).unwrap();
            assert_eq!(report.average(), 5.0);
            assert_eq!(EpochLogger::peek(("eval", "mean_return")), Some(5.0));
            EpochLogger::log(iter);
            assert_eq!(EpochLogger::peek(("eval", "mean_return")), None);
            scale *= -1.0;
        }
        assert_eq!(evaluator.best_mean_return(), Some(5.0));
        assert_eq!(evaluator.history().len(), 3);
        assert_eq!(evaluator.history()[2], (2, 5.0));
    }

    #[test]
    fn test_eval_config_defaults() {
        let config = EvalConfig::new("Pendulum-v1".to_string());
        assert_eq!(config.num_eval, 10);
        assert_eq!(config.max_episode_steps, 1000);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_eval_config_save_load() {
        let path = std::env::temp_dir().join(format!("eval_config_{}.json", std::process::id()));
        EvalConfig::new("CartPole-v1".to_string())
            .with_num_eval(4)
            .with_seed(Some(9))
            .save(&path)
            .unwrap();
        let loaded = EvalConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.env_id, "CartPole-v1");
        assert_eq!(loaded.num_eval, 4);
        assert_eq!(loaded.max_episode_steps, 1000);
        assert_eq!(loaded.seed, Some(9));
    }
}
