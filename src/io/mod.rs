pub mod json_store;
pub mod office_io;
pub mod recovery;
pub mod state;
pub mod store;
pub mod watcher;
