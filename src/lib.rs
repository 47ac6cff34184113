//! Samples realistic, internally-consistent synthetic browser identities
//! (HTTP headers plus a structured fingerprint) from Bayesian networks
//! trained on real browser traffic.
//!
//! Callers supply the trained network data and lookup tables as raw bytes;
//! this crate does not bundle any training data of its own.

pub mod fingerprint;
pub mod headers;
pub mod network;

pub use fingerprint::types::{FingerprintOverrides, FingerprintWithHeaders, ScreenConstraints};
pub use fingerprint::{FingerprintError, FingerprintGenerator, FingerprintGeneratorSources};
pub use headers::{
  Browser, HeaderError, HeaderGenerator, HeaderGeneratorOptions, HeaderGeneratorSources, HeaderOverrides, Headers,
};
pub use network::{Assignment, BayesianNetwork, ClosureError, LoaderError};
