//! Peak and summary statistics over angle-indexed arrays.
//!
//! These reduce the kinematic and force sweeps to the handful of numbers an
//! engineer reads off the plots: where the extremes sit, how large they are,
//! and how much the soil reaction adds to the crank torque.

use ndarray::Array1;
use serde::Serialize;

use crate::error::ValidationError;
use crate::forces::ForceTorqueResult;
use crate::kinematics::KinematicProfile;

/// An extreme value and the crank angle where it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    /// Position in the source array.
    pub index: usize,
    /// Crank angle of the peak (degrees).
    pub theta_deg: f64,
    /// Signed value at `theta_deg`.
    pub value: f64,
}

impl Peak {
    /// Magnitude of the peak value.
    #[inline(always)]
    pub fn abs(&self) -> f64 {
        self.value.abs()
    }
}

fn check(theta_deg: &Array1<f64>, values: &Array1<f64>) -> Result<(), ValidationError> {
    if values.len() != theta_deg.len() {
        return Err(ValidationError::LengthMismatch {
            expected: theta_deg.len(),
            got: values.len(),
        });
    }
    if values.is_empty() {
        return Err(ValidationError::SweepTooShort { min: 1, got: 0 });
    }
    Ok(())
}

/// First index maximizing `key`; ties keep the earliest angle.
fn arg_best(
    theta_deg: &Array1<f64>,
    values: &Array1<f64>,
    key: impl Fn(f64) -> f64,
) -> Result<Peak, ValidationError> {
    check(theta_deg, values)?;
    let mut index = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if key(v) > key(values[index]) {
            index = i;
        }
    }
    Ok(Peak {
        index,
        theta_deg: theta_deg[index],
        value: values[index],
    })
}

/// Largest |value|, keeping its sign.
pub fn peak_abs(theta_deg: &Array1<f64>, values: &Array1<f64>) -> Result<Peak, ValidationError> {
    arg_best(theta_deg, values, f64::abs)
}

/// Largest value.
pub fn max(theta_deg: &Array1<f64>, values: &Array1<f64>) -> Result<Peak, ValidationError> {
    arg_best(theta_deg, values, |v| v)
}

/// Smallest value.
pub fn min(theta_deg: &Array1<f64>, values: &Array1<f64>) -> Result<Peak, ValidationError> {
    arg_best(theta_deg, values, |v| -v)
}

/// Smallest |value|, keeping its sign.
pub fn trough_abs(theta_deg: &Array1<f64>, values: &Array1<f64>) -> Result<Peak, ValidationError> {
    arg_best(theta_deg, values, |v| -v.abs())
}

/// Mean of |value|; zero for an empty array.
pub fn mean_abs(values: &Array1<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.mapv(f64::abs).sum() / values.len() as f64
}

/// Extremes of a kinematic profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KinematicSummary {
    /// Highest tip position relative to the soil.
    pub position_max: Peak,
    /// Lowest tip position; negative when the tip goes into the soil.
    pub position_min: Peak,
    /// Tip travel over the sweep.
    pub stroke: f64,
    /// Deepest penetration (positive), zero if the tip never enters the soil.
    pub max_depth: f64,
    /// Largest |v|.
    pub velocity: Peak,
    /// Largest |a|.
    pub acceleration: Peak,
    /// Largest |j|.
    pub jerk: Peak,
}

impl KinematicSummary {
    /// Summary of a kinematic profile.
    pub fn from_profile(profile: &KinematicProfile) -> Result<Self, ValidationError> {
        let theta = &profile.theta_deg;
        let position_max = max(theta, &profile.position)?;
        let position_min = min(theta, &profile.position)?;

        Ok(Self {
            position_max,
            position_min,
            stroke: position_max.value - position_min.value,
            max_depth: (-position_min.value).max(0.0),
            velocity: peak_abs(theta, &profile.velocity)?,
            acceleration: peak_abs(theta, &profile.acceleration)?,
            jerk: peak_abs(theta, &profile.jerk)?,
        })
    }
}

/// Extremes of a force and torque sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForceSummary {
    /// Largest |F_B|.
    pub rod_force: Peak,
    /// Largest |F_M|.
    pub crank_force: Peak,
    /// Largest |τ|.
    pub torque: Peak,
    /// Smallest |τ|.
    pub torque_min_abs: Peak,
    /// Mean |τ| over the sweep.
    pub mean_abs_torque: f64,
}

impl ForceSummary {
    /// Summary of a force/torque sweep.
    pub fn from_result(result: &ForceTorqueResult) -> Result<Self, ValidationError> {
        let theta = &result.theta_deg;
        Ok(Self {
            rod_force: peak_abs(theta, &result.rod_force)?,
            crank_force: peak_abs(theta, &result.crank_force)?,
            torque: peak_abs(theta, &result.torque)?,
            torque_min_abs: trough_abs(theta, &result.torque)?,
            mean_abs_torque: mean_abs(&result.torque),
        })
    }
}

/// Percent increase of peak |τ| caused by the soil reaction.
///
/// `None` when the unloaded peak is zero.
pub fn ground_force_influence(torque_with: &Array1<f64>, torque_without: &Array1<f64>) -> Option<f64> {
    let peak = |values: &Array1<f64>| values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let without = peak(torque_without);
    if without == 0.0 {
        return None;
    }
    Some((peak(torque_with) - without) / without * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_peak_abs_keeps_sign() {
        let theta = array![0.0, 1.0, 2.0, 3.0];
        let values = array![1.0, -5.0, 4.0, 5.0];
        let peak = peak_abs(&theta, &values).unwrap();
        // tie between -5 and 5 goes to the first
        assert_eq!(peak.index, 1);
        assert_eq!(peak.theta_deg, 1.0);
        assert_eq!(peak.value, -5.0);
        assert_eq!(peak.abs(), 5.0);
    }

    #[test]
    fn test_max_min_trough() {
        let theta = array![10.0, 20.0, 30.0];
        let values = array![-2.0, 0.5, 3.0];
        assert_eq!(max(&theta, &values).unwrap().theta_deg, 30.0);
        assert_eq!(min(&theta, &values).unwrap().value, -2.0);
        assert_eq!(trough_abs(&theta, &values).unwrap().value, 0.5);
    }

    #[test]
    fn test_mean_abs() {
        assert_relative_eq!(mean_abs(&array![1.0, -3.0, 2.0]), 2.0);
        assert_eq!(mean_abs(&Array1::zeros(0)), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = peak_abs(&array![0.0, 1.0], &array![1.0]).unwrap_err();
        assert_eq!(err, ValidationError::LengthMismatch { expected: 2, got: 1 });
        assert!(max(&Array1::zeros(0), &Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_ground_force_influence() {
        let with = array![0.0, -15.0, 3.0];
        let without = array![0.0, 10.0, -2.0];
        assert_relative_eq!(ground_force_influence(&with, &without).unwrap(), 50.0);
        assert_eq!(ground_force_influence(&with, &Array1::zeros(3)), None);
    }
}
