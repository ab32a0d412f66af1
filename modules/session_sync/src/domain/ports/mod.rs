pub mod auth;
pub mod profiles;

pub use auth::AuthClient;
pub use profiles::ProfileStore;
