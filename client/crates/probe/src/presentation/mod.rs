//! Presentation Layer
//!
//! Wire DTOs shared by the fingerprint endpoints and the CLI output.

pub mod dto;
