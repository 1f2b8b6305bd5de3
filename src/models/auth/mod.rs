pub mod context;
pub mod requests;
pub mod responses;

pub use context::AuthContext;
pub use requests::{LoginRequest, RegisterRequest};
pub use responses::{LoginResponse, RefreshTokenResponse, UserInfoResponse};
