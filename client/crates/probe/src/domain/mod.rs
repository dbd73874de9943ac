//! Domain Layer - Probe vocabulary and pure logic
//!
//! This layer contains:
//! - Domain entities (WebRtcResult, ClientFingerprint, ConnectionVerdict)
//! - Domain value objects (browser facts, ICE types, surface results)
//! - Domain services (IPv4 extraction, range classification, digests)
//! - Port traits (peer connection, browser environment, reporter)

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
