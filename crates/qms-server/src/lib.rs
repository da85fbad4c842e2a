//! # qms-server
//!
//! HTTP server library for QMS, the single-queue ticket dispatch system.
//!
//! This library provides the API handlers and state management for QMS.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
