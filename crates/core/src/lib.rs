//! Domain logic for the map poster client.
//!
//! Everything in this crate is synchronous and free of I/O: progress step
//! resolution, the job state machine, request validation, reference-data
//! snapshots and download planning. The async client in `maposter-client`
//! drives these pieces against the remote service.

pub mod artifact;
pub mod catalog;
pub mod error;
pub mod job;
pub mod request;
pub mod state;
pub mod steps;
pub mod types;
