//! Test utilities for the chunk pipeline
//!
//! Provides synthetic chunk generation for every supported encoding so the
//! assembler, repair and decode stages can be exercised without a robot.

pub mod chunk_generator;

pub use chunk_generator::*;
