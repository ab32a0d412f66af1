pub mod local;

pub use local::SessionSyncLocalClient;
