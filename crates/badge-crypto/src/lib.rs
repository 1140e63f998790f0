//! # badge-crypto — Keys and Signatures for Badge Credentials
//!
//! ## Modules
//!
//! - [`algorithm`]: the closed [`JwsAlgorithm`] set and [`KeyFamily`].
//! - [`keys`]: [`PrivateKey`], [`PublicKey`], [`KeyPair`], PEM and [`Jwk`] I/O.
//! - [`jws`]: compact JWS encode/decode.
//! - [`legacy`]: RSA-SHA256 hosted-verification signatures.
//! - [`key_manager`]: [`KeyManager`] and the [`KeySource`] backends.
//!
//! ## Crate Policy
//!
//! - Private key material is never logged and never shown by `Debug`.
//! - No `.unwrap()` outside tests.

pub mod algorithm;
pub mod error;
pub mod jws;
pub mod key_manager;
pub mod keys;
pub mod legacy;

pub use algorithm::{JwsAlgorithm, KeyFamily};
pub use error::CryptoError;
pub use jws::{DecodedJws, JwsHeader};
pub use key_manager::{
    DirectoryKeySource, EphemeralKeySource, KeyManager, KeyManagerConfig, KeySource,
    StaticKeySource,
};
pub use keys::{Jwk, KeyPair, PrivateKey, PublicKey};
