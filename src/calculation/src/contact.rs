//! Crank angles at which the rod tip crosses the soil surface.
//!
//! The crossings are the roots of `f(θ) = center_height − y(θ)`. Each root is
//! polished independently by Newton iteration from its own initial guess. If
//! Newton gives up, the solver scans a bracket around the guess for a sign
//! change and bisects it. When both fail the caller gets a
//! [`ConvergenceError`] with the last angle tried; a stale guess is never
//! returned as if it were a root.

use serde::{Deserialize, Serialize};

use crate::error::{ConvergenceError, DoserError, GeometryError};
use crate::geometry::Geometry;
use crate::kinematics::{KinematicState, KinematicsEngine};

/// Initial guess for the entry (descent) crossing.
pub const DEFAULT_DESCENT_GUESS_DEG: f64 = 120.0;

/// Initial guess for the exit (ascent) crossing.
pub const DEFAULT_ASCENT_GUESS_DEG: f64 = 240.0;

/// Below this |df/dθ| a Newton step is meaningless (dead centers).
const DERIVATIVE_FLOOR: f64 = 1e-12;

/// Largest Newton step, in radians.
const MAX_NEWTON_STEP: f64 = 0.5;

/// Sub-intervals per side scanned by the bracketing fallback.
const FALLBACK_SEGMENTS: usize = 24;

/// Root-finder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Accept a root once |f(θ)| falls below this (geometry length unit).
    pub tolerance: f64,
    /// Iteration cap for Newton and, separately, for bisection.
    pub max_iterations: usize,
    /// Half-width of the bracket scanned by the fallback (degrees).
    pub fallback_half_width_deg: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            max_iterations: 100,
            fallback_half_width_deg: 60.0,
        }
    }
}

/// Entry and exit crossing angles, in degrees within [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundContact {
    /// Rod tip enters the soil.
    pub descent_deg: f64,
    /// Rod tip leaves the soil.
    pub ascent_deg: f64,
}

impl GroundContact {
    /// Crank angle spent below the soil surface.
    pub fn span_deg(&self) -> f64 {
        self.ascent_deg - self.descent_deg
    }

    /// Entry angle in radians.
    pub fn descent_rad(&self) -> f64 {
        self.descent_deg.to_radians()
    }

    /// Exit angle in radians.
    pub fn ascent_rad(&self) -> f64 {
        self.ascent_deg.to_radians()
    }
}

/// Newton/bisection solver for `y_ground(θ) = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContactSolver {
    geometry: Geometry,
    options: SolverOptions,
}

impl GroundContactSolver {
    /// Solver with default tolerance and iteration cap.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            options: SolverOptions::default(),
        }
    }

    /// Replace the tuning.
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Both crossings from the default guesses (120° and 240°).
    pub fn find(&self) -> Result<GroundContact, DoserError> {
        self.find_from(DEFAULT_DESCENT_GUESS_DEG, DEFAULT_ASCENT_GUESS_DEG)
    }

    /// Both crossings from caller-chosen guesses.
    pub fn find_from(
        &self,
        descent_guess_deg: f64,
        ascent_guess_deg: f64,
    ) -> Result<GroundContact, DoserError> {
        let contact = GroundContact {
            descent_deg: self.solve_from(descent_guess_deg)?,
            ascent_deg: self.solve_from(ascent_guess_deg)?,
        };
        tracing::info!(
            descent = contact.descent_deg,
            ascent = contact.ascent_deg,
            "ground contact angles"
        );
        Ok(contact)
    }

    /// One crossing near `guess_deg`, wrapped to [0, 360).
    pub fn solve_from(&self, guess_deg: f64) -> Result<f64, DoserError> {
        if !guess_deg.is_finite() {
            return Err(GeometryError::InvalidAngle(guess_deg).into());
        }
        let guess = guess_deg.to_radians();

        let root = match self.newton(guess, guess_deg) {
            Ok(root) => root,
            Err(newton_err) => {
                tracing::warn!(
                    guess_deg,
                    residual = newton_err.residual,
                    "Newton failed, falling back to bracketing"
                );
                match self.bracket(guess)? {
                    Some((lo, hi)) => self.bisect(lo, hi, guess_deg)?,
                    None => return Err(newton_err.into()),
                }
            }
        };

        Ok(root.to_degrees().rem_euclid(360.0))
    }

    #[inline(always)]
    fn residual(&self, theta: f64) -> Result<f64, GeometryError> {
        self.geometry.ground_relative_position(theta)
    }

    /// df/dθ = −dy/dθ, the rod-tip velocity at unit crank speed.
    #[inline(always)]
    fn slope(&self, theta: f64) -> Result<f64, GeometryError> {
        let engine = KinematicsEngine::new(self.geometry);
        Ok(-engine.velocity(&KinematicState::constant_speed(theta, 1.0))?)
    }

    fn newton(&self, guess: f64, guess_deg: f64) -> Result<f64, ConvergenceError> {
        let fail = |theta: f64, residual: f64, iterations: usize| ConvergenceError {
            guess_deg,
            last_theta_deg: theta.to_degrees(),
            residual,
            iterations,
        };

        let mut theta = guess;
        let mut f = f64::NAN;
        for iteration in 0..self.options.max_iterations {
            f = self.residual(theta).map_err(|_| fail(theta, f, iteration))?;
            if f.abs() < self.options.tolerance {
                tracing::debug!(iteration, theta_deg = theta.to_degrees(), "Newton converged");
                return Ok(theta);
            }
            let df = self.slope(theta).map_err(|_| fail(theta, f, iteration))?;
            if df.abs() < DERIVATIVE_FLOOR {
                return Err(fail(theta, f, iteration));
            }
            theta -= (f / df).clamp(-MAX_NEWTON_STEP, MAX_NEWTON_STEP);
        }

        Err(fail(theta, f, self.options.max_iterations))
    }

    /// Nearest sub-interval around `guess` whose ends straddle the soil.
    fn bracket(&self, guess: f64) -> Result<Option<(f64, f64)>, GeometryError> {
        let step = self.options.fallback_half_width_deg.to_radians() / FALLBACK_SEGMENTS as f64;
        for k in 0..FALLBACK_SEGMENTS {
            let near = k as f64 * step;
            let far = near + step;
            for (a, b) in [(guess - far, guess - near), (guess + near, guess + far)] {
                if self.residual(a)? * self.residual(b)? <= 0.0 {
                    return Ok(Some((a, b)));
                }
            }
        }
        Ok(None)
    }

    fn bisect(&self, mut lo: f64, mut hi: f64, guess_deg: f64) -> Result<f64, DoserError> {
        let mut f_lo = self.residual(lo)?;
        let mut last = (lo, f_lo);

        for _ in 0..self.options.max_iterations {
            let mid = 0.5 * (lo + hi);
            let f_mid = self.residual(mid)?;
            last = (mid, f_mid);
            if f_mid.abs() < self.options.tolerance {
                return Ok(mid);
            }
            if f_lo * f_mid <= 0.0 {
                hi = mid;
            } else {
                lo = mid;
                f_lo = f_mid;
            }
        }

        Err(ConvergenceError {
            guess_deg,
            last_theta_deg: last.0.to_degrees(),
            residual: last.1,
            iterations: self.options.max_iterations,
        }
        .into())
    }
}
