//! fifodev Common Library
//!
//! This crate provides shared constants and configuration loading utilities
//! for all fifodev workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Channel sizing constants and control-register defaults
//! - [`config`] - Configuration loading traits and types
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! fifodev = { package = "fifodev_common", path = "../fifodev_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use fifodev_common::consts::*;
//! use fifodev_common::config::{ConfigLoader, DeviceConfig};
//! ```

pub mod config;
pub mod consts;
