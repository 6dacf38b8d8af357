//! Autosphere MCP broker
//!
//! Bridges the MCP tool protocol to an AWX job orchestration backend and an
//! optional Prometheus metrics backend. The AWX client core handles
//! authentication strategy resolution, TTL-cached reads, and a retrying
//! launch pipeline; thin service façades map client calls onto the tool
//! surface, and the server module renders every result as a human-readable
//! summary plus a structured JSON payload.

pub mod awx;
pub mod cache;
pub mod config;
pub mod error;
pub mod prometheus;
pub mod server;
pub mod services;
