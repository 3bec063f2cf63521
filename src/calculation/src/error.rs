//! Error types for mechanism analysis.
//!
//! Every failure mode of the engines is a typed variant. Nothing in the
//! library turns an invalid evaluation into a NaN that looks like data.

use thiserror::Error;

/// Top-level error type for doser-calc.
#[derive(Debug, Error)]
pub enum DoserError {
    /// Invalid mechanism geometry or evaluation point.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// The contact root finder gave up.
    #[error("Convergence error: {0}")]
    Convergence(#[from] ConvergenceError),

    /// Undefined derived quantity.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Inconsistent call arguments.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Geometric parameters that cannot describe a slider-crank.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    /// A length that must be positive is not.
    #[error("{name} must be a finite positive length, got {value}")]
    NonPositiveLength {
        /// Offending parameter.
        name: &'static str,
        /// Value supplied.
        value: f64,
    },

    /// A value that must be finite is NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFinite {
        /// Offending parameter.
        name: &'static str,
        /// Value supplied.
        value: f64,
    },

    /// The link cannot span the crank.
    #[error("rod length {rod_length} must exceed crank radius {crank_radius}")]
    RodTooShort {
        /// Link length L.
        rod_length: f64,
        /// Crank radius r.
        crank_radius: f64,
    },

    /// `L² − r²sin²θ` went negative.
    #[error("negative radicand {radicand} at theta = {theta} rad")]
    NegativeRadicand {
        /// Crank angle (rad).
        theta: f64,
        /// Value under the square root.
        radicand: f64,
    },

    /// Crank angle is NaN or infinite.
    #[error("crank angle must be finite, got {0}")]
    InvalidAngle(f64),
}

/// The ground-contact root finder gave up.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error(
    "no ground crossing near {guess_deg}° after {iterations} iterations \
     (last angle {last_theta_deg}°, residual {residual})"
)]
pub struct ConvergenceError {
    /// Initial guess (degrees).
    pub guess_deg: f64,
    /// Last angle evaluated (degrees).
    pub last_theta_deg: f64,
    /// Height above the soil at the last angle.
    pub residual: f64,
    /// Iterations spent.
    pub iterations: usize,
}

/// Derived quantities that are undefined for the given inputs.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DomainError {
    /// The stretch holds less than one seed.
    #[error("distance too short for given seed density ({seeds_per_meter} seeds/m over {distance_m} m)")]
    NoSeeds {
        /// Requested density.
        seeds_per_meter: f64,
        /// Stretch length (m).
        distance_m: f64,
    },

    /// The stretch would hold more seeds than can be laid out.
    #[error("too many seeds to lay out ({seeds_per_meter} seeds/m over {distance_m} m)")]
    TooManySeeds {
        /// Requested density.
        seeds_per_meter: f64,
        /// Stretch length (m).
        distance_m: f64,
    },

    /// Mean germination is zero or negative.
    #[error("germination rates must sum to a positive value, got {min} + {max}")]
    NonPositiveGermination {
        /// Lower rate, as a fraction.
        min: f64,
        /// Upper rate, as a fraction.
        max: f64,
    },

    /// A quantity that must be positive is not.
    #[error("{name} must be finite and positive, got {value}")]
    NonPositive {
        /// Offending quantity.
        name: &'static str,
        /// Value supplied.
        value: f64,
    },
}

/// Inputs that are inconsistent with each other (usage errors).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ValidationError {
    /// A per-angle array does not match the sweep.
    #[error("array length mismatch: sweep has {expected} angles, got {got} values")]
    LengthMismatch {
        /// Sweep length.
        expected: usize,
        /// Array length.
        got: usize,
    },

    /// Too few points to form a sweep.
    #[error("angle sweep needs at least {min} points, got {got}")]
    SweepTooShort {
        /// Smallest allowed count.
        min: usize,
        /// Count requested.
        got: usize,
    },

    /// Window bounds are non-finite or out of order.
    #[error("angle window [{start}°, {end}°] is empty or inverted")]
    InvalidWindow {
        /// Lower bound (degrees).
        start: f64,
        /// Upper bound (degrees).
        end: f64,
    },

    /// A ground load value is NaN or infinite.
    #[error("ground load at index {index} is not finite: {value}")]
    NonFiniteLoad {
        /// Position in the per-angle load.
        index: usize,
        /// Value supplied.
        value: f64,
    },

    /// Soil stiffness is negative or not finite.
    #[error("ground stiffness must be finite and non-negative, got {0}")]
    InvalidStiffness(f64),
}

/// Malformed or incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML or misses required keys.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A key holds a value outside its valid range.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Dotted key path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Lookup of a crop missing from the catalog.
    #[error("Crop '{name}' not found. Available: {available}")]
    UnknownCrop {
        /// Name as requested.
        name: String,
        /// Comma-separated catalog names.
        available: String,
    },

    /// No usable crop entry.
    #[error("No valid crop found in catalog")]
    EmptyCatalog,
}

/// Result alias used across the crate.
pub type Result<T, E = DoserError> = std::result::Result<T, E>;
