pub mod automation;
pub mod check;
pub mod executor;
pub mod finalize;
pub mod search;
