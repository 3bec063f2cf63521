//! Pin forces and crank torque.
//!
//! Quasi-static balance of the rod and the connecting link at constant crank
//! speed, without friction in the rod guide. All quantities are SI: the
//! engine rescales its geometry to meters on construction.
//!
//! Per crank angle:
//!
//! ```text
//! F_By = m_rod·a_B − P_rod + F_ground
//! F_B  = F_By / cos β
//! F_M  = m_link·a_link − F_B − P_link·cos β
//! τ    = r·F_M·sin(θ − β)
//! ```
//!
//! `a_B` is the rod-tip acceleration and `a_link` the component along the
//! link of its mid-point acceleration, taken as the mean of the crank-pin and
//! rod-pin accelerations.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{DoserError, GeometryError, ValidationError};
use crate::geometry::{AngleSweep, Geometry, LengthUnit};
use crate::ground_force::GroundForceCurve;
use crate::kinematics::{KinematicState, KinematicsEngine};

/// Standard gravity (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Masses (kg) and weights (N) of the moving parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadCase {
    /// Rod mass (kg).
    pub rod_mass: f64,
    /// Link mass (kg).
    pub link_mass: f64,
    /// Rod weight (N).
    pub rod_weight: f64,
    /// Link weight (N).
    pub link_weight: f64,
}

impl LoadCase {
    /// Weights from masses under `gravity` (m/s²).
    pub fn from_masses(rod_mass: f64, link_mass: f64, gravity: f64) -> Self {
        Self {
            rod_mass,
            link_mass,
            rod_weight: rod_mass * gravity,
            link_weight: link_mass * gravity,
        }
    }

    /// Rod 1.16094 kg, link 0.75022 kg, under standard gravity.
    pub fn reference() -> Self {
        Self::from_masses(1.16094, 0.75022, STANDARD_GRAVITY)
    }
}

impl Default for LoadCase {
    fn default() -> Self {
        Self::reference()
    }
}

/// Vertical soil reaction fed into the balance (N).
#[derive(Debug, Clone, PartialEq)]
pub enum GroundLoad {
    /// Same value at every angle.
    Uniform(f64),
    /// One value per sweep angle.
    PerAngle(Array1<f64>),
}

impl GroundLoad {
    /// No soil contact.
    pub const fn none() -> Self {
        GroundLoad::Uniform(0.0)
    }

    /// Expand to one value per angle of `sweep`.
    ///
    /// With an active window, angles outside `[min, max]` (inclusive,
    /// degrees) get no ground load. Every supplied value must be finite.
    pub fn broadcast(
        &self,
        sweep: &AngleSweep,
        active_range_deg: Option<(f64, f64)>,
    ) -> Result<Array1<f64>, ValidationError> {
        let mut values = match self {
            GroundLoad::Uniform(value) => Array1::from_elem(sweep.len(), *value),
            GroundLoad::PerAngle(values) => {
                if values.len() != sweep.len() {
                    return Err(ValidationError::LengthMismatch {
                        expected: sweep.len(),
                        got: values.len(),
                    });
                }
                values.clone()
            }
        };

        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::NonFiniteLoad { index, value });
        }

        if let Some((start, end)) = active_range_deg {
            if !start.is_finite() || !end.is_finite() || start > end {
                return Err(ValidationError::InvalidWindow { start, end });
            }
            values.zip_mut_with(sweep.degrees(), |value, &theta| {
                if theta < start || theta > end {
                    *value = 0.0;
                }
            });
        }

        Ok(values)
    }
}

impl From<&GroundForceCurve> for GroundLoad {
    fn from(curve: &GroundForceCurve) -> Self {
        GroundLoad::PerAngle(curve.force.clone())
    }
}

impl From<f64> for GroundLoad {
    fn from(value: f64) -> Self {
        GroundLoad::Uniform(value)
    }
}

/// Forces at one crank angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinForces {
    /// Axial link force at the rod pin (N).
    pub rod_force: f64,
    /// Axial force from the crank on the link (N).
    pub crank_force: f64,
    /// Link angle β (rad).
    pub rod_angle: f64,
}

/// Angle-indexed force and torque arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceTorqueResult {
    /// Crank angles (degrees).
    pub theta_deg: Array1<f64>,
    /// Ground load actually applied at each angle (N).
    pub ground_force: Array1<f64>,
    /// Axial link force at the rod pin, F_B (N).
    pub rod_force: Array1<f64>,
    /// Crank force on the link, F_M (N).
    pub crank_force: Array1<f64>,
    /// Crank shaft torque (N·m).
    pub torque: Array1<f64>,
}

impl ForceTorqueResult {
    /// Number of angles.
    pub fn len(&self) -> usize {
        self.theta_deg.len()
    }

    /// `true` for an empty result.
    pub fn is_empty(&self) -> bool {
        self.theta_deg.is_empty()
    }
}

/// Force and torque balance for one mechanism and load case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceTorqueEngine {
    kinematics: KinematicsEngine,
    loads: LoadCase,
}

impl ForceTorqueEngine {
    /// Engine for `geometry`, rescaled to meters.
    pub fn new(geometry: &Geometry, loads: LoadCase) -> Self {
        Self {
            kinematics: KinematicsEngine::new(geometry.to_unit(LengthUnit::Meter)),
            loads,
        }
    }

    /// The geometry in meters.
    pub fn geometry(&self) -> &Geometry {
        self.kinematics.geometry()
    }

    /// Masses and weights in use.
    pub fn loads(&self) -> &LoadCase {
        &self.loads
    }

    /// Acceleration of the link mid-point along the link (m/s²).
    pub fn link_axial_acceleration(&self, theta: f64, omega: f64) -> Result<f64, GeometryError> {
        let g = self.geometry();
        let r = g.crank_radius();
        let (s, c) = theta.sin_cos();
        let w2 = omega * omega;

        let crank_pin = (-w2 * r * s, -w2 * r * c);
        let rod_pin = (0.0, self.rod_acceleration(theta, omega)?);
        let mid = (
            0.5 * (crank_pin.0 + rod_pin.0),
            0.5 * (crank_pin.1 + rod_pin.1),
        );

        let (sin_beta, cos_beta) = g.rod_angle(theta)?.sin_cos();
        Ok(mid.0 * sin_beta + mid.1 * cos_beta)
    }

    #[inline(always)]
    fn rod_acceleration(&self, theta: f64, omega: f64) -> Result<f64, GeometryError> {
        self.kinematics
            .acceleration(&KinematicState::constant_speed(theta, omega))
    }

    /// Pin forces at one angle under a given ground load.
    pub fn pin_forces_at(
        &self,
        theta: f64,
        omega: f64,
        ground_force: f64,
    ) -> Result<PinForces, GeometryError> {
        if !ground_force.is_finite() {
            return Err(GeometryError::NonFinite {
                name: "ground force",
                value: ground_force,
            });
        }
        let g = self.geometry();
        let loads = &self.loads;

        let vertical = loads.rod_mass * self.rod_acceleration(theta, omega)? - loads.rod_weight
            + ground_force;
        let cos_beta = g.cos_rod_angle(theta)?;
        let rod_force = vertical / cos_beta;

        let rod_angle = g.rod_angle(theta)?;
        let crank_force = loads.link_mass * self.link_axial_acceleration(theta, omega)?
            - rod_force
            - loads.link_weight * rod_angle.cos();

        Ok(PinForces {
            rod_force,
            crank_force,
            rod_angle,
        })
    }

    /// Shaft torque at one angle.
    #[inline(always)]
    pub fn torque_at(&self, theta: f64, omega: f64, ground_force: f64) -> Result<f64, GeometryError> {
        let pins = self.pin_forces_at(theta, omega, ground_force)?;
        Ok(self.geometry().crank_radius() * pins.crank_force * (theta - pins.rod_angle).sin())
    }

    /// `(F_B, F_M)` over the sweep, with the ground load applied everywhere.
    pub fn pin_forces(
        &self,
        sweep: &AngleSweep,
        ground: &GroundLoad,
        omega: f64,
    ) -> Result<(Array1<f64>, Array1<f64>), DoserError> {
        let ground = ground.broadcast(sweep, None)?;
        let n = sweep.len();
        let mut rod_force = Array1::zeros(n);
        let mut crank_force = Array1::zeros(n);

        for (i, (&theta, &f_ground)) in sweep.radians().iter().zip(ground.iter()).enumerate() {
            let pins = self.pin_forces_at(theta, omega, f_ground)?;
            rod_force[i] = pins.rod_force;
            crank_force[i] = pins.crank_force;
        }

        Ok((rod_force, crank_force))
    }

    /// Shaft torque over the sweep.
    ///
    /// `active_range_deg` limits the ground load to an inclusive window of
    /// crank angles; `None` applies it everywhere.
    pub fn torque(
        &self,
        sweep: &AngleSweep,
        ground: &GroundLoad,
        omega: f64,
        active_range_deg: Option<(f64, f64)>,
    ) -> Result<Array1<f64>, DoserError> {
        Ok(self.analyze(sweep, ground, omega, active_range_deg)?.torque)
    }

    /// Ground load, pin forces and torque in one pass.
    pub fn analyze(
        &self,
        sweep: &AngleSweep,
        ground: &GroundLoad,
        omega: f64,
        active_range_deg: Option<(f64, f64)>,
    ) -> Result<ForceTorqueResult, DoserError> {
        let ground_force = ground.broadcast(sweep, active_range_deg)?;
        let n = sweep.len();
        let mut rod_force = Array1::zeros(n);
        let mut crank_force = Array1::zeros(n);
        let mut torque = Array1::zeros(n);
        let r = self.geometry().crank_radius();

        for (i, (&theta, &f_ground)) in sweep.radians().iter().zip(ground_force.iter()).enumerate() {
            let pins = self.pin_forces_at(theta, omega, f_ground)?;
            rod_force[i] = pins.rod_force;
            crank_force[i] = pins.crank_force;
            torque[i] = r * pins.crank_force * (theta - pins.rod_angle).sin();
        }

        tracing::debug!(points = n, omega, "force and torque sweep computed");

        Ok(ForceTorqueResult {
            theta_deg: sweep.degrees().clone(),
            ground_force,
            rod_force,
            crank_force,
            torque,
        })
    }
}
