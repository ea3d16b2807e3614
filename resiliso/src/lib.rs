//! # Resiliso
//!
//! Builds bootable ISO 9660 + El Torito disc images and protects the embedded boot
//! payload against single-block corruption.
//!
//! The crate has two coupled subsystems:
//!     1. the block redundancy engine: fixed-size blocks, a SHA-256 hash chain that
//!        detects content changes and reordering, an XOR parity block and a recovery
//!        routine that rebuilds one missing or corrupted block.
//!     2. the disc image assembler: volume descriptors, boot catalog, path tables and
//!        root directory laid out at explicit logical block addresses, with the
//!        redundancy artifacts embedded as ordinary files.
//!
//! `pipeline::Pipeline` ties both together behind a single `ResilisoConfig`.
//!
//! Copyrights © 2025, Resiliso Contributors

pub mod config;
pub mod constants;
pub mod core;
pub mod disc_image;
pub mod pipeline;
pub mod prelude;
pub mod redundancy_set;
pub mod resiliso_errors;
pub mod utils;
