//! End-to-end analyses of a configured mechanism.
//!
//! Each function takes the full immutable configuration and returns fresh
//! arrays plus their summaries; nothing is cached between calls.

use crate::config::MechanismConfig;
use crate::contact::{GroundContact, GroundContactSolver};
use crate::error::DoserError;
use crate::forces::{ForceTorqueEngine, ForceTorqueResult, GroundLoad};
use crate::geometry::{AngleSweep, LengthUnit};
use crate::ground_force::{GroundForceCurve, build_variable_ground_force};
use crate::kinematics::{KinematicProfile, KinematicState, KinematicsEngine};
use crate::metrics::{ForceSummary, KinematicSummary, ground_force_influence};

/// How the soil reaction is modeled in a torque analysis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GroundModel {
    /// No soil contact.
    None,
    /// The same force (N) at every crank angle.
    Constant(f64),
    /// Piecewise model built from the configured [`GroundForceParams`].
    ///
    /// [`GroundForceParams`]: crate::ground_force::GroundForceParams
    #[default]
    Variable,
}

/// Contact angles and kinematic profile at one crank speed.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicAnalysis {
    /// Crank speed (rad/s).
    pub omega: f64,
    /// Soil entry and exit angles.
    pub contact: GroundContact,
    /// Millimeter-based profile.
    pub profile: KinematicProfile,
    /// Peaks and stroke of `profile`.
    pub summary: KinematicSummary,
}

/// Contact angles and the rod-tip profile at constant crank speed.
pub fn kinematic_analysis(
    config: &MechanismConfig,
    sweep: &AngleSweep,
    omega: f64,
) -> Result<KinematicAnalysis, DoserError> {
    let geometry = config.geometry(LengthUnit::Millimeter)?;
    let contact = GroundContactSolver::new(geometry)
        .with_options(config.solver)
        .find()?;
    let profile =
        KinematicsEngine::new(geometry).profile(sweep, KinematicState::constant_speed(0.0, omega))?;
    let summary = KinematicSummary::from_profile(&profile)?;

    tracing::info!(
        omega,
        max_depth_mm = summary.max_depth,
        peak_acceleration = summary.acceleration.value,
        "kinematic analysis done"
    );

    Ok(KinematicAnalysis {
        omega,
        contact,
        profile,
        summary,
    })
}

/// Pin forces and torque at one crank speed, with and without soil.
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueAnalysis {
    /// Crank speed (rad/s).
    pub omega: f64,
    /// Soil model used for `result`.
    pub model: GroundModel,
    /// Present for [`GroundModel::Variable`].
    pub curve: Option<GroundForceCurve>,
    /// Forces and torque under `model`.
    pub result: ForceTorqueResult,
    /// Peaks of `result`.
    pub summary: ForceSummary,
    /// Same sweep without any soil reaction.
    pub unloaded: ForceSummary,
    /// Percent increase of peak |τ| over the unloaded case.
    pub ground_influence_pct: Option<f64>,
}

/// Pin forces and crank torque at constant crank speed.
pub fn torque_analysis(
    config: &MechanismConfig,
    sweep: &AngleSweep,
    omega: f64,
    model: GroundModel,
) -> Result<TorqueAnalysis, DoserError> {
    let geometry = config.geometry(LengthUnit::Millimeter)?;
    let engine = ForceTorqueEngine::new(&geometry, config.load_case());

    let (curve, load) = match model {
        GroundModel::None => (None, GroundLoad::none()),
        GroundModel::Constant(force) => (None, GroundLoad::Uniform(force)),
        GroundModel::Variable => {
            let curve = build_variable_ground_force(sweep, &geometry, &config.ground_force)?;
            let load = GroundLoad::from(&curve);
            (Some(curve), load)
        }
    };

    let result = engine.analyze(sweep, &load, omega, None)?;
    let baseline = engine.analyze(sweep, &GroundLoad::none(), omega, None)?;
    let summary = ForceSummary::from_result(&result)?;
    let unloaded = ForceSummary::from_result(&baseline)?;
    let ground_influence_pct = ground_force_influence(&result.torque, &baseline.torque);

    tracing::info!(
        omega,
        peak_torque = summary.torque.value,
        at_deg = summary.torque.theta_deg,
        "torque analysis done"
    );

    Ok(TorqueAnalysis {
        omega,
        model,
        curve,
        result,
        summary,
        unloaded,
        ground_influence_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_kinematic_analysis_reference() {
        let analysis =
            kinematic_analysis(&MechanismConfig::default(), &AngleSweep::full_turn(), 20.0)
                .unwrap();
        assert_abs_diff_eq!(analysis.contact.descent_deg, 123.2823, epsilon = 1e-3);
        assert_abs_diff_eq!(analysis.summary.max_depth, 50.0, epsilon = 1e-9);
        assert_eq!(analysis.summary.position_min.theta_deg, 180.0);
        assert_abs_diff_eq!(analysis.summary.stroke, 2.0 * 84.01, epsilon = 1e-9);
    }

    #[test]
    fn test_torque_models() {
        let config = MechanismConfig::default();
        let sweep = AngleSweep::full_turn();

        let none = torque_analysis(&config, &sweep, 20.0, GroundModel::None).unwrap();
        assert!(none.curve.is_none());
        assert_eq!(none.summary, none.unloaded);
        assert_abs_diff_eq!(none.ground_influence_pct.unwrap(), 0.0);

        let variable = torque_analysis(&config, &sweep, 20.0, GroundModel::default()).unwrap();
        let curve = variable.curve.as_ref().unwrap();
        assert_eq!(curve.theta_peak_deg, 168.0);
        assert_eq!(variable.result.ground_force, curve.force);
        assert!(variable.ground_influence_pct.unwrap() > 0.0);

        let constant = torque_analysis(&config, &sweep, 20.0, GroundModel::Constant(10.0)).unwrap();
        assert!(constant.result.ground_force.iter().all(|&f| f == 10.0));
    }
}
