//! Orchestrator phases that prepare the source tree.
//!
//! - **Preparation** (`prep`): defconfig preflight, unpack, defconfig injection

pub mod prep;

pub use prep::{inject_defconfig, preflight_defconfig, unpack_source};
