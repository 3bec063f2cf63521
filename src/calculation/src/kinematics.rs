//! Rod-tip kinematics of the slider-crank.
//!
//! Velocity, acceleration and jerk are the analytic time derivatives of
//! [`Geometry::position`] under a crank turning at `ω = dθ/dt`. When the crank
//! speed itself varies, the angular acceleration `α` and its rate `β` enter
//! through additive correction terms:
//!
//! - acceleration: `+ v(θ)·α`
//! - jerk: `+ 3·a(θ)·ω·α + v(θ)·β`
//!
//! These corrections are an approximation for slowly varying crank speed and
//! are not the full chain-rule expansion. With `α = β = 0` the results are
//! exact.
//!
//! Every quantity is expressed in the length unit of the geometry it was
//! computed from (mm/s, mm/s², mm/s³ for a millimeter geometry).

use std::f64::consts::PI;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::geometry::{AngleSweep, Geometry, LengthUnit};

pub use crate::spacing::seeds_per_meter;

/// Crank angle (rad) and its first three time rates.
///
/// `omega`, `alpha` and `beta` default to zero: a crank at rest.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KinematicState {
    /// Crank angle θ (rad).
    pub theta: f64,
    /// Crank speed ω (rad/s).
    pub omega: f64,
    /// Crank angular acceleration α (rad/s²).
    pub alpha: f64,
    /// Rate of α, β (rad/s³).
    pub beta: f64,
}

impl KinematicState {
    /// State from angle and all three rates.
    pub const fn new(theta: f64, omega: f64, alpha: f64, beta: f64) -> Self {
        Self {
            theta,
            omega,
            alpha,
            beta,
        }
    }

    /// Crank turning at constant angular speed.
    pub const fn constant_speed(theta: f64, omega: f64) -> Self {
        Self::new(theta, omega, 0.0, 0.0)
    }

    /// Same rates at another crank angle.
    pub const fn at(self, theta: f64) -> Self {
        Self { theta, ..self }
    }

    /// Rejects a non-finite ω, α or β.
    pub fn check_rates(&self) -> Result<(), GeometryError> {
        for (name, value) in [("omega", self.omega), ("alpha", self.alpha), ("beta", self.beta)] {
            if !value.is_finite() {
                return Err(GeometryError::NonFinite { name, value });
            }
        }
        Ok(())
    }
}

/// Evaluates rod-tip kinematics for one geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsEngine {
    geometry: Geometry,
}

impl KinematicsEngine {
    /// Engine for `geometry`, in its own unit.
    pub const fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    /// Geometry the engine evaluates.
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Rod-tip velocity `dy/dt`.
    ///
    /// `v = r·sinθ·(1 − r·cosθ / sqrt(L² − r²sin²θ))·ω`
    #[inline(always)]
    pub fn velocity(&self, state: &KinematicState) -> Result<f64, GeometryError> {
        state.check_rates()?;
        let r = self.geometry.crank_radius();
        let (s, c) = state.theta.sin_cos();
        let root = self.geometry.root(state.theta)?;

        Ok(r * s * (1.0 - r * c / root) * state.omega)
    }

    /// Rod-tip acceleration `d²y/dt²`.
    ///
    /// The only acceleration formula in the crate: force computations use it
    /// with `alpha = 0`.
    #[inline(always)]
    pub fn acceleration(&self, state: &KinematicState) -> Result<f64, GeometryError> {
        state.check_rates()?;
        let r = self.geometry.crank_radius();
        let theta = state.theta;
        let root = self.geometry.root(theta)?;
        let q = root * root;
        let (s2, c2) = (2.0 * theta).sin_cos();

        let numerator = r * r * (4.0 * q * c2 + (r * s2).powi(2));
        let denominator = 4.0 * q * root;
        let mut accel = (r * theta.cos() - numerator / denominator) * state.omega.powi(2);

        if state.alpha != 0.0 {
            accel += self.velocity(state)? * state.alpha;
        }

        Ok(accel)
    }

    /// Rod-tip jerk `d³y/dt³`.
    pub fn jerk(&self, state: &KinematicState) -> Result<f64, GeometryError> {
        state.check_rates()?;
        let r = self.geometry.crank_radius();
        let theta = state.theta;
        let root = self.geometry.root(theta)?;
        let q = root * root;
        let (s2, c2) = (2.0 * theta).sin_cos();

        // d³y/dθ³
        let third = -r * theta.sin()
            + r * r * s2 * (16.0 * q * q - 3.0 * r * r * (4.0 * q * c2 + (r * s2).powi(2)))
                / (8.0 * q * q * root);

        let mut jerk = third * state.omega.powi(3);
        if state.alpha != 0.0 {
            jerk += 3.0 * self.acceleration(state)? * state.omega * state.alpha;
        }
        if state.beta != 0.0 {
            jerk += self.velocity(state)? * state.beta;
        }

        Ok(jerk)
    }

    /// Position, velocity, acceleration and jerk over a sweep.
    ///
    /// `rates` supplies ω, α and β; its `theta` is ignored. Positions are
    /// relative to the soil, as in [`Geometry::ground_relative_position`].
    pub fn profile(
        &self,
        sweep: &AngleSweep,
        rates: KinematicState,
    ) -> Result<KinematicProfile, GeometryError> {
        rates.check_rates()?;
        let n = sweep.len();
        let mut position = Array1::zeros(n);
        let mut velocity = Array1::zeros(n);
        let mut acceleration = Array1::zeros(n);
        let mut jerk = Array1::zeros(n);

        for (i, &theta) in sweep.radians().iter().enumerate() {
            let state = rates.at(theta);
            position[i] = self.geometry.ground_relative_position(theta)?;
            velocity[i] = self.velocity(&state)?;
            acceleration[i] = self.acceleration(&state)?;
            jerk[i] = self.jerk(&state)?;
        }

        tracing::debug!(points = n, omega = rates.omega, "kinematic profile computed");

        Ok(KinematicProfile {
            theta_deg: sweep.degrees().clone(),
            position,
            velocity,
            acceleration,
            jerk,
            unit: self.geometry.unit(),
        })
    }
}

/// Angle-indexed kinematic arrays, paired 1:1 with `theta_deg`.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicProfile {
    /// Crank angles (degrees).
    pub theta_deg: Array1<f64>,
    /// Rod tip relative to the soil.
    pub position: Array1<f64>,
    /// dy/dt.
    pub velocity: Array1<f64>,
    /// d²y/dt².
    pub acceleration: Array1<f64>,
    /// d³y/dt³.
    pub jerk: Array1<f64>,
    /// Length unit of every array above.
    pub unit: LengthUnit,
}

impl KinematicProfile {
    /// Number of angles.
    pub fn len(&self) -> usize {
        self.theta_deg.len()
    }

    /// `true` for an empty profile.
    pub fn is_empty(&self) -> bool {
        self.theta_deg.is_empty()
    }
}

/// Crank speed (rad/s) that drops `seeds_per_meter` seeds per meter at the
/// given tractor speed, one seed per crank turn.
#[inline(always)]
pub fn angular_speed(vehicle_speed_kmh: f64, seeds_per_meter: f64) -> f64 {
    2.0 * PI * vehicle_speed_kmh * seeds_per_meter / 3.6
}

/// rad/s to revolutions per minute.
#[inline(always)]
pub fn omega_to_rpm(omega: f64) -> f64 {
    omega * 60.0 / (2.0 * PI)
}

/// Revolutions per minute to rad/s.
#[inline(always)]
pub fn rpm_to_omega(rpm: f64) -> f64 {
    rpm * 2.0 * PI / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const OMEGA: f64 = 20.0;

    fn engine() -> KinematicsEngine {
        KinematicsEngine::new(Geometry::reference())
    }

    #[test]
    fn test_velocity_zero_at_dead_centers() {
        let k = engine();
        for omega in [1.0, 20.0, 300.0] {
            let v0 = k.velocity(&KinematicState::constant_speed(0.0, omega)).unwrap();
            let v_pi = k.velocity(&KinematicState::constant_speed(PI, omega)).unwrap();
            assert_abs_diff_eq!(v0, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(v_pi, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_velocity_is_derivative_of_position() {
        let k = engine();
        let g = Geometry::reference();
        let h = 1e-6;
        for theta in [0.3, 1.1, 2.0, 2.9, 4.0, 5.5] {
            let numeric = (g.position(theta + h).unwrap() - g.position(theta - h).unwrap())
                / (2.0 * h)
                * OMEGA;
            let v = k.velocity(&KinematicState::constant_speed(theta, OMEGA)).unwrap();
            assert_relative_eq!(v, numeric, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_acceleration_is_derivative_of_velocity() {
        let k = engine();
        let h = 1e-6;
        for theta in [0.2, 1.0, 1.9, 3.0, 4.4, 6.0] {
            let v = |t: f64| k.velocity(&KinematicState::constant_speed(t, OMEGA)).unwrap();
            let numeric = (v(theta + h) - v(theta - h)) / (2.0 * h) * OMEGA;
            let a = k
                .acceleration(&KinematicState::constant_speed(theta, OMEGA))
                .unwrap();
            assert_relative_eq!(a, numeric, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_jerk_is_derivative_of_acceleration() {
        let k = engine();
        let h = 1e-5;
        for theta in [0.4, 1.0, 2.2, 3.5, 5.1] {
            let a = |t: f64| {
                k.acceleration(&KinematicState::constant_speed(t, OMEGA))
                    .unwrap()
            };
            let numeric = (a(theta + h) - a(theta - h)) / (2.0 * h) * OMEGA;
            let j = k.jerk(&KinematicState::constant_speed(theta, OMEGA)).unwrap();
            assert_relative_eq!(j, numeric, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_acceleration_at_top_dead_center() {
        let k = engine();
        let a = k.acceleration(&KinematicState::constant_speed(0.0, OMEGA)).unwrap();
        // (r − r²/L)·ω²
        let expected = (84.01 - 84.01 * 84.01 / 210.0) * OMEGA * OMEGA;
        assert_relative_eq!(a, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_alpha_adds_velocity_term() {
        let k = engine();
        let theta = 1.3;
        let base = k
            .acceleration(&KinematicState::constant_speed(theta, OMEGA))
            .unwrap();
        let state = KinematicState::new(theta, OMEGA, 5.0, 0.0);
        let v = k.velocity(&state).unwrap();
        assert_relative_eq!(
            k.acceleration(&state).unwrap(),
            base + v * 5.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_jerk_corrections() {
        let k = engine();
        let theta = 2.4;
        let (alpha, beta) = (3.0, 7.0);
        let plain = k.jerk(&KinematicState::constant_speed(theta, OMEGA)).unwrap();
        let state = KinematicState::new(theta, OMEGA, alpha, beta);
        let a = k.acceleration(&state).unwrap();
        let v = k.velocity(&state).unwrap();
        assert_relative_eq!(
            k.jerk(&state).unwrap(),
            plain + 3.0 * a * OMEGA * alpha + v * beta,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_non_finite_rates_rejected() {
        let k = engine();
        let nan_speed = KinematicState::constant_speed(1.0, f64::NAN);
        assert!(matches!(
            k.velocity(&nan_speed),
            Err(GeometryError::NonFinite { name: "omega", .. })
        ));
        assert!(k.acceleration(&nan_speed).is_err());

        let bad_alpha = KinematicState::new(1.0, OMEGA, f64::INFINITY, 0.0);
        assert!(matches!(
            k.acceleration(&bad_alpha),
            Err(GeometryError::NonFinite { name: "alpha", .. })
        ));
        let bad_beta = KinematicState::new(1.0, OMEGA, 0.0, f64::NAN);
        assert!(matches!(
            k.jerk(&bad_beta),
            Err(GeometryError::NonFinite { name: "beta", .. })
        ));
        assert!(k.profile(&AngleSweep::full_turn(), nan_speed).is_err());
    }

    #[test]
    fn test_units_follow_geometry() {
        let mm = engine();
        let m = KinematicsEngine::new(Geometry::reference().to_unit(LengthUnit::Meter));
        let state = KinematicState::constant_speed(1.7, OMEGA);
        assert_relative_eq!(
            m.acceleration(&state).unwrap() * 1000.0,
            mm.acceleration(&state).unwrap(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_profile_shapes() {
        let k = engine();
        let sweep = AngleSweep::full_turn();
        let p = k
            .profile(&sweep, KinematicState::constant_speed(0.0, OMEGA))
            .unwrap();
        assert_eq!(p.len(), 361);
        assert_eq!(p.velocity.len(), 361);
        assert_eq!(p.jerk.len(), 361);
        assert_eq!(p.unit, LengthUnit::Millimeter);
        // deepest point at bottom dead center
        assert_relative_eq!(p.position[180], -50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rpm_round_trip() {
        let n = seeds_per_meter(250_000.0, 400_000.0, 0.85, 0.95).unwrap();
        let omega = angular_speed(7.0, n);
        let rpm = omega_to_rpm(omega);
        assert_relative_eq!(rpm_to_omega(rpm), omega, max_relative = 1e-12);
        assert_relative_eq!(omega_to_rpm(2.0 * PI), 60.0);
    }

    #[test]
    fn test_angular_speed_formula() {
        // 7 km/h with 18.0556 seeds/m: 2π·7·N/3.6
        let n = 18.055_555_555_555_557;
        assert_relative_eq!(angular_speed(7.0, n), 220.590_224_904_838_86, max_relative = 1e-12);
    }
}
