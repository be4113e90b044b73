//! Authentication module
//!
//! Session tokens are JWTs signed with a shared secret; passwords are
//! hashed with argon2id.

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtService, TokenKind};
pub use middleware::AuthUser;
pub use password::PasswordService;
