pub mod cart_pole;
pub mod env;
pub mod episode_runner;
pub mod pendulum;
pub mod registry;
pub mod space;
