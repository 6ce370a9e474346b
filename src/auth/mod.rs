/// Authentication module
///
/// Password hashing, signed access tokens, opaque refresh tokens and the
/// session issuer that ties them together.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::{Claims, ISSUER};
pub use jwt::generate_access_token;
pub use jwt::validate_access_token;
pub use password::{hash_password, verify_password, HASH_COST};
pub use refresh_token::{
    generate_refresh_token, issue_refresh_token, lookup_refresh_token, revoke_all_user_tokens,
    revoke_refresh_token, token_fingerprint, RefreshToken,
};
pub use session::{LoginSession, RenewedAccess, SessionIssuer};
