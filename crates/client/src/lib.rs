//! Async client for the map poster service.
//!
//! Submits generation requests, polls the resulting job until it reaches a
//! terminal state, loads reference data, and fetches finished artifacts.
//! Lifecycle rules live in `maposter_core::state`; this crate executes the
//! effects they produce against the network.

pub mod api;
pub mod catalog;
pub mod config;
pub mod download;
pub mod poller;
pub mod session;
pub mod transport;
