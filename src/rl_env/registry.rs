use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use log::{debug, warn};

use super::cart_pole::{CartPole, CartPoleConfig};
use super::env::{Env, EnvGuard};
use super::pendulum::{Pendulum, PendulumConfig};
use super::space::Space;
use crate::error::{Result, RlError};

pub type EnvConstructor = Arc<dyn Fn() -> anyhow::Result<Box<dyn Env>> + Send + Sync>;

lazy_static! {
    static ref ENV_REGISTRY: Mutex<BTreeMap<String, EnvConstructor>> = {
        let mut registry = BTreeMap::<String, EnvConstructor>::new();
        registry.insert(
            "Pendulum-v1".to_string(),
            Arc::new(|| Ok(Box::new(Pendulum::new(PendulumConfig::new())) as Box<dyn Env>)),
        );
        registry.insert(
            "CartPole-v1".to_string(),
            Arc::new(|| Ok(Box::new(CartPole::new(CartPoleConfig::new())) as Box<dyn Env>)),
        );
        Mutex::new(registry)
    };
}

/// Registers (or replaces) the constructor behind `env_id`.
pub fn register_env<F>(env_id: &str, constructor: F)
where
    F: Fn() -> anyhow::Result<Box<dyn Env>> + Send + Sync + 'static,
{
    let mut registry = ENV_REGISTRY
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if registry
        .insert(env_id.to_string(), Arc::new(constructor))
        .is_some()
    {
        debug!("replaced env constructor for {}", env_id);
    }
}

pub fn registered_env_ids() -> Vec<String> {
    ENV_REGISTRY
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .keys()
        .cloned()
        .collect()
}

/// Builds the environment registered under `env_id`.
///
/// The returned guard closes the environment when it goes out of scope.
pub fn make_env(env_id: &str) -> Result<EnvGuard> {
    // Clone the constructor out so the registry lock is not held while it runs.
    let constructor = ENV_REGISTRY
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(env_id)
        .cloned()
        .ok_or_else(|| RlError::EnvironmentResolution {
            env_id: env_id.to_string(),
        })?;
    match constructor() {
        Ok(env) => Ok(EnvGuard::new(env_id, env)),
        Err(err) => {
            warn!("constructing env {} failed: {:#}", env_id, err);
            Err(RlError::EnvironmentResolution {
                env_id: env_id.to_string(),
            })
        }
    }
}

/// Observation and action spaces of `env_id`. The instance built to read them is closed before returning.
pub fn get_env_spaces(env_id: &str) -> Result<(Space, Space)> {
    let mut env = make_env(env_id)?;
    let observation_space = env.observation_space();
    let action_space = env.action_space();
    env.close();
    Ok((observation_space, action_space))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_env::env::tests::ConstRewardEnv;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builtin_spaces() {
        let (obs, action) = get_env_spaces("Pendulum-v1").unwrap();
        assert_eq!(obs.shape(), vec![3]);
        assert_eq!(action, Space::uniform_box(-2.0, 2.0, 1));

        let (obs, action) = get_env_spaces("CartPole-v1").unwrap();
        assert_eq!(obs.flat_dim(), 4);
        assert_eq!(action, Space::Discrete { n: 2 });
    }

    #[test]
    fn test_unknown_id() {
        let err = get_env_spaces("NoSuchEnv-v0").unwrap_err();
        assert!(matches!(err, RlError::EnvironmentResolution { ref env_id } if env_id == "NoSuchEnv-v0"));
    }

    #[test]
    fn test_space_lookup_releases_env() {
        let live = Arc::new(AtomicUsize::new(0));
        let counter = live.clone();
        register_env("SpacesStub-v0", move || {
            Ok(Box::new(ConstRewardEnv::new(1.0, 5, counter.clone())) as Box<dyn Env>)
        });
        let (obs, _) = get_env_spaces("SpacesStub-v0").unwrap();
        assert_eq!(obs.flat_dim(), 1);
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(registered_env_ids().contains(&"SpacesStub-v0".to_string()));
    }

    #[test]
    fn test_failing_constructor() {
        register_env("Broken-v0", || anyhow::bail!("missing asset"));
        assert!(matches!(
            make_env("Broken-v0"),
            Err(RlError::EnvironmentResolution { .. })
        ));
    }
}
