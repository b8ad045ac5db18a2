pub mod auth;
pub mod rate_limit;
pub mod role;

pub use auth::*;
pub use rate_limit::*;
pub use role::*;
