//! AWX client core: authenticated HTTP, typed endpoints, cached reads, and
//! the launch pipeline.

pub mod auth;
pub mod client;
pub mod launcher;
pub mod models;

pub use client::{AwxClient, AwxConfig};
pub use launcher::{JobLauncher, LaunchOptions, LaunchResult};
