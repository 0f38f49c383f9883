// Authentication: password hashing, bearer tokens, the session authority and
// the request guards built on it.

mod extract;
pub mod password;
mod session;
pub mod token;

pub use extract::{bearer_token, cookie_token, session_cookie, ActiveUser, AuthUser, SESSION_COOKIE};
pub use password::PasswordError;
pub use session::{check_active, Session, SessionAuthority, VerifiedToken};
pub use token::{Claims, TokenError, TokenKeys};
