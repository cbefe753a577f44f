//! Foundation module - Low-level utilities shared by the scene
//!
//! - `math`: nalgebra aliases plus the matrix builders the renderer needs
//! - `collections`: insertion-ordered slot map backing the object graph
//! - `logging`: `env_logger` setup for binaries and tests

pub mod collections;
pub mod logging;
pub mod math;
