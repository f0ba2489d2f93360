//! Kernel Source Management Module
//!
//! Handles interactions with the Linux kernel source tree:
//! - Downloading the pinned source archive
//! - Discovering and applying local patches
//! - Harvesting build outputs into the staging layout

pub mod sources;

pub mod patcher;

pub mod harvest;
