//! Domain layer for the SIASIS attendance backend.
//!
//! This crate contains:
//! - Domain models (report parameters, attendance counts, chart points,
//!   cached events and month buckets)
//! - Business logic services (report key encoding, chart transformation,
//!   local event cache synchronization)
//! - Collaborator traits for storage and remote sources

pub mod models;
pub mod services;
