// Crypto module declarations

pub mod keys;
pub mod jwk;
pub mod hash;
