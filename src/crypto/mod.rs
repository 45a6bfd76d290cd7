//! Key unwrap and record decryption.
pub mod aead;
pub mod suite;
pub mod token;
pub mod unwrap;
