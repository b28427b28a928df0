//! Shared test fixtures for PlanForge crates.
//!
//! This crate provides collaborators for testing the planning layer.
//! It depends only on `planforge-core` to avoid circular dependencies.
//!
//! - [`arm`] - Planar two-link arm model with analytic IK
//! - [`scene`] - Joint-space obstacle scene
//! - [`engines`] - Reference engines (straight line, random tree, stalling, scripted)
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! planforge-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use planforge_test::arm::PlanarArm;
//! use planforge_test::scene::ObstacleScene;
//! use planforge_test::engines::RandomTreeEngine;
//! ```

pub mod arm;
pub mod engines;
pub mod scene;

// Re-export commonly used types at crate root for convenience
pub use arm::{PlanarArm, PlanarArmIk};
pub use engines::{
    CountingEngine, RandomTreeEngine, ScriptedEngine, StallingEngine, StraightLineEngine,
};
pub use scene::ObstacleScene;
