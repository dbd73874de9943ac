//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations for the probe:
//! - Cryptographic utilities (SHA-256, random tokens)
//! - STUN (RFC 5389) Binding codec
//! - Host facts (locale, timezone, parallelism, reachability)

pub mod crypto;
pub mod host;
pub mod stun;
