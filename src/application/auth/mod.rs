//! Bearer credential validation and the ordered authorization stages.

mod guard;
pub mod token;

pub use guard::{AccessGuard, AuthError, OwnerLookup};
pub use token::{Claims, TokenError, TokenIssuer, TokenValidator};
