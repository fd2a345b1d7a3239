//! End-to-end streaming tests
//!
//! A recording flows from segment files through the log source into the
//! decode pipeline and the block cache.

#[path = "../common/mod.rs"]
mod common;

mod blocks;
mod playback;
mod schemas;
