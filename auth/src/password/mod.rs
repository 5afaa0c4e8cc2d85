pub mod argon2;
pub mod errors;

pub use argon2::PasswordVerifier;
pub use errors::PasswordError;
