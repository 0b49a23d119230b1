pub mod evaluate;
pub mod logger;
pub mod noise;
pub mod policy;
pub mod polyak;
