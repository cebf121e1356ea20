//! Dime Arcade Engine core -- leaf utilities with no engine dependencies.
//!
//! Geometry primitives, the dynamic containers backing the entity
//! registries, polled input state, fixed-tick pacing, and the JSON
//! engine configuration.

pub mod config;
pub mod containers;
pub mod geometry;
pub mod input;
pub mod time;
