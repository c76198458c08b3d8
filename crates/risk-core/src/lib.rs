pub mod classifier;
pub mod error;
pub mod sample;
pub mod types;

pub use classifier::*;
pub use error::*;
pub use sample::*;
pub use types::*;
