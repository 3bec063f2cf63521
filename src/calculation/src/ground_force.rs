//! Vertical soil reaction on the rod tip.
//!
//! The soil pushes back only while the crank sweeps the penetration band
//! `[θ_start, θ_end]`. Inside the band the reaction grows with the square of
//! the penetration depth until the tip reaches the target depth at `θ_peak`,
//! then holds at the value reached there:
//!
//! ```text
//! F(θ) = k·y(θ)²        θ_start ≤ θ ≤ θ_peak
//!      = k·y_target²    θ_peak  < θ ≤ θ_end
//!      = 0              otherwise
//! ```
//!
//! Depths are in millimeters and `k` is in N/mm², whatever unit the caller's
//! geometry uses.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{DoserError, ValidationError};
use crate::geometry::{AngleSweep, Geometry, LengthUnit};

/// Crank angle at which the tip enters the soil (degrees).
pub const PENETRATION_START_DEG: f64 = 123.28;

/// Crank angle at which the reaction stops (bottom dead center, degrees).
pub const PENETRATION_END_DEG: f64 = 180.0;

/// Working depth of the rod tip (mm, negative below the surface).
pub const TARGET_DEPTH_MM: f64 = -47.15;

/// Soil/tool stiffness from the penetrometer test, in N/mm².
///
/// `k = 134.10 · 6.17 · π · (25.4 / 94.3)² / 1000`
pub fn default_stiffness() -> f64 {
    134.10 * 6.17 * std::f64::consts::PI * (25.4_f64 / 94.3).powi(2) / 1000.0
}

/// Parameters of the piecewise soil model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundForceParams {
    /// First crank angle of the penetration band (degrees).
    pub theta_start_deg: f64,
    /// Last crank angle of the penetration band (degrees).
    pub theta_end_deg: f64,
    /// Depth at which the reaction stops growing (mm, negative below the soil).
    pub target_depth_mm: f64,
    /// N/mm².
    pub stiffness: f64,
}

impl Default for GroundForceParams {
    fn default() -> Self {
        Self {
            theta_start_deg: PENETRATION_START_DEG,
            theta_end_deg: PENETRATION_END_DEG,
            target_depth_mm: TARGET_DEPTH_MM,
            stiffness: default_stiffness(),
        }
    }
}

impl GroundForceParams {
    /// Rejects an inverted band or a negative stiffness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (start, end) = (self.theta_start_deg, self.theta_end_deg);
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        if !self.stiffness.is_finite() || self.stiffness < 0.0 {
            return Err(ValidationError::InvalidStiffness(self.stiffness));
        }
        Ok(())
    }

    /// Plateau value `k·y_target²` (N).
    #[inline(always)]
    pub fn max_force(&self) -> f64 {
        self.stiffness * self.target_depth_mm * self.target_depth_mm
    }

    #[inline(always)]
    fn in_band(&self, theta_deg: f64) -> bool {
        theta_deg >= self.theta_start_deg && theta_deg <= self.theta_end_deg
    }
}

/// Soil reaction sampled over a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundForceCurve {
    /// Crank angles (degrees).
    pub theta_deg: Array1<f64>,
    /// Reaction force (N), never negative.
    pub force: Array1<f64>,
    /// Ground-relative tip position used by the model (mm).
    pub depth_mm: Array1<f64>,
    /// First sampled angle where the target depth is reached, or the band
    /// end when it never is.
    pub theta_peak_deg: f64,
    /// Plateau force `k·target²` (N).
    pub max_force: f64,
    /// Whether any sampled band angle reached the target depth.
    pub target_reached: bool,
    /// Parameters the curve was built from.
    pub params: GroundForceParams,
}

impl GroundForceCurve {
    /// Penetration band as `(start, end)` in degrees.
    pub fn band(&self) -> (f64, f64) {
        (self.params.theta_start_deg, self.params.theta_end_deg)
    }
}

/// Build the piecewise soil reaction over `sweep`.
///
/// The peak search only looks at sampled angles, so `θ_peak` is as coarse as
/// the sweep. Band edges are inclusive, and the peak sample itself belongs to
/// the rising segment.
pub fn build_variable_ground_force(
    sweep: &AngleSweep,
    geometry: &Geometry,
    params: &GroundForceParams,
) -> Result<GroundForceCurve, DoserError> {
    params.validate()?;

    let depth_mm = geometry
        .to_unit(LengthUnit::Millimeter)
        .ground_profile(sweep)?;
    let theta_deg = sweep.degrees();

    let peak = theta_deg
        .iter()
        .zip(depth_mm.iter())
        .find(|&(&t, &d)| params.in_band(t) && d <= params.target_depth_mm)
        .map(|(&t, _)| t);
    if peak.is_none() {
        tracing::warn!(
            target_depth_mm = params.target_depth_mm,
            "target depth never reached, no plateau"
        );
    }
    let theta_peak_deg = peak.unwrap_or(params.theta_end_deg);

    let max_force = params.max_force();
    let force = Array1::from_iter(theta_deg.iter().zip(depth_mm.iter()).map(|(&t, &d)| {
        if !params.in_band(t) {
            0.0
        } else if t <= theta_peak_deg {
            params.stiffness * d * d
        } else {
            max_force
        }
    }));

    tracing::debug!(
        theta_peak = theta_peak_deg,
        max_force,
        stiffness = params.stiffness,
        "variable ground force built"
    );

    Ok(GroundForceCurve {
        theta_deg: theta_deg.clone(),
        force,
        depth_mm,
        theta_peak_deg,
        max_force,
        target_reached: peak.is_some(),
        params: *params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn reference_curve() -> GroundForceCurve {
        build_variable_ground_force(
            &AngleSweep::full_turn(),
            &Geometry::reference(),
            &GroundForceParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_default_stiffness() {
        assert_relative_eq!(default_stiffness(), 0.188_585_311, max_relative = 1e-8);
        assert_relative_eq!(GroundForceParams::default().max_force(), 419.248_248, max_relative = 1e-8);
    }

    #[test]
    fn test_reference_peak() {
        let curve = reference_curve();
        assert_eq!(curve.theta_peak_deg, 168.0);
        assert_abs_diff_eq!(curve.max_force, 419.2482, epsilon = 1e-3);
        assert!(curve.target_reached);
        // k·y(150°)²
        assert_abs_diff_eq!(curve.force[150], 224.4755, epsilon = 1e-3);
    }

    #[test]
    fn test_zero_outside_band() {
        let curve = reference_curve();
        for (&t, &f) in curve.theta_deg.iter().zip(curve.force.iter()) {
            if t < PENETRATION_START_DEG || t > PENETRATION_END_DEG {
                assert_eq!(f, 0.0, "force at {t}°");
            }
        }
    }

    #[test]
    fn test_rising_then_plateau() {
        let curve = reference_curve();
        let peak = curve.theta_peak_deg as usize;

        for i in 124..peak {
            assert!(curve.force[i + 1] >= curve.force[i], "dip at {i}°");
        }
        for i in (peak + 1)..=180 {
            assert_eq!(curve.force[i], curve.max_force);
        }
        // the peak sample is still on the quadratic branch
        let d = curve.depth_mm[peak];
        assert_relative_eq!(curve.force[peak], curve.params.stiffness * d * d);
        assert!(curve.force.iter().all(|&f| f >= 0.0));
    }

    #[test]
    fn test_unreached_target_has_no_plateau() {
        let params = GroundForceParams {
            target_depth_mm: -60.0,
            ..GroundForceParams::default()
        };
        let curve =
            build_variable_ground_force(&AngleSweep::full_turn(), &Geometry::reference(), &params)
                .unwrap();
        assert_eq!(curve.theta_peak_deg, PENETRATION_END_DEG);
        assert!(!curve.target_reached);
        // deepest point is −50 mm at 180°
        assert_abs_diff_eq!(curve.force[180], params.stiffness * 2500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_meter_geometry_gives_same_curve() {
        let sweep = AngleSweep::full_turn();
        let mm = reference_curve();
        let m = build_variable_ground_force(
            &sweep,
            &Geometry::reference().to_unit(LengthUnit::Meter),
            &GroundForceParams::default(),
        )
        .unwrap();
        assert_eq!(m.theta_peak_deg, mm.theta_peak_deg);
        for (a, b) in mm.force.iter().zip(m.force.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let sweep = AngleSweep::full_turn();
        let g = Geometry::reference();
        let inverted = GroundForceParams {
            theta_start_deg: 190.0,
            ..GroundForceParams::default()
        };
        assert!(matches!(
            build_variable_ground_force(&sweep, &g, &inverted),
            Err(DoserError::Validation(ValidationError::InvalidWindow { .. }))
        ));
        let negative = GroundForceParams {
            stiffness: -1.0,
            ..GroundForceParams::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::InvalidStiffness(_))
        ));
    }
}
