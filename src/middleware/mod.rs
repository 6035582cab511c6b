pub mod auth;
pub mod remove_blanks;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use remove_blanks::remove_blanks_middleware;
pub use response::{ApiResponse, ApiResult};
