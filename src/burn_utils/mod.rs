pub mod rand;
pub mod sequence;
pub use self::rand::*;
pub use sequence::*;
