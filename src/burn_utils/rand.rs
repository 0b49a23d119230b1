use std::sync::Mutex;

use burn::prelude::Backend;
use lazy_static::lazy_static;
use log::debug;
use ndarray_rand::rand as array_rand;
use ndarray_rand::rand::SeedableRng as ArraySeedableRng;
use rand::rngs::StdRng;
use rand::SeedableRng;

lazy_static! {
    // General purpose generator: env resets.
    static ref GLOBAL_RNG: Mutex<StdRng> = Mutex::new(StdRng::from_os_rng());
    // Generator behind ndarray sampling (ndarray-rand pins its own rand version).
    static ref ARRAY_RNG: Mutex<array_rand::rngs::StdRng> =
        Mutex::new(array_rand::rngs::StdRng::from_entropy());
}

/// Seeds every random source the crate draws from.
///
/// `None` leaves all generators untouched so runs stay non-deterministic.
/// With `Some(seed)` the general purpose generator, the ndarray generator and
/// the burn backend `B` are all reseeded; calling it twice with the same seed
/// restarts the same streams.
pub fn set_seeds<B: Backend>(seed: Option<u64>) {
    let Some(seed) = seed else {
        return;
    };
    *lock(&GLOBAL_RNG) = StdRng::seed_from_u64(seed);
    *lock(&ARRAY_RNG) = array_rand::rngs::StdRng::seed_from_u64(seed);
    B::seed(seed);
    debug!("seeded random sources with {}", seed);
}

/// Runs `f` with exclusive access to the general purpose generator.
pub fn with_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    f(&mut lock(&GLOBAL_RNG))
}

/// Runs `f` with exclusive access to the generator used for ndarray sampling.
pub fn with_array_rng<T>(f: impl FnOnce(&mut array_rand::rngs::StdRng) -> T) -> T {
    f(&mut lock(&ARRAY_RNG))
}

// A panic while a generator is held cannot leave it in an invalid state.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
