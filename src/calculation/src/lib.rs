//! Kinematics, soil load and crank torque of a slider-crank seed doser.
//!
//! This library provides closed-form models for:
//! - Rod-tip position, velocity, acceleration and jerk against crank angle
//! - The crank angles where the rod tip enters and leaves the soil
//! - A piecewise soil-reaction force on the rod tip
//! - Pin forces in the connecting link and the crank shaft torque
//! - Seed density and spacing along the planting row
//!
//! # Units
//!
//! Geometry is carried as a unit-tagged [`Geometry`] value. Kinematics are
//! reported in the geometry's own unit; the soil model works in millimeters
//! and the force engine in meters, each converting once on entry.
//!
//! # Example
//!
//! ```
//! use doser_calc::{AngleSweep, MechanismConfig, analysis::{torque_analysis, GroundModel}};
//!
//! let config = MechanismConfig::default();
//! let sweep = AngleSweep::full_turn();
//! let torque = torque_analysis(&config, &sweep, 20.0, GroundModel::Variable).unwrap();
//! assert_eq!(torque.summary.torque.theta_deg, 158.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::doc_markdown)]

pub mod analysis;
pub mod config;
pub mod contact;
pub mod crops;
pub mod error;
pub mod forces;
pub mod geometry;
pub mod ground_force;
pub mod kinematics;
pub mod metrics;
pub mod spacing;

// Re-export key types and functions for easy use
pub use config::MechanismConfig;
pub use contact::{GroundContact, GroundContactSolver, SolverOptions};
pub use crops::{CropCatalog, CropRecord};
pub use error::{DoserError, Result};
pub use forces::{ForceTorqueEngine, ForceTorqueResult, GroundLoad, LoadCase};
pub use geometry::{AngleSweep, Geometry, LengthUnit};
pub use ground_force::{GroundForceCurve, GroundForceParams, build_variable_ground_force};
pub use kinematics::{KinematicProfile, KinematicState, KinematicsEngine};
pub use metrics::{ForceSummary, KinematicSummary, Peak};
pub use spacing::{SeedSpacing, seeds_per_meter, spacing};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
