pub mod errors;
pub mod iam;

pub use errors::AuthError;
pub use iam::TokenCache;
