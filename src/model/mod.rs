pub mod case;
pub mod board;
pub mod transition;
pub mod workflow;
pub mod office;
pub mod config;

pub use case::*;
pub use board::*;
pub use transition::*;
pub use workflow::*;
pub use office::*;
pub use config::*;
