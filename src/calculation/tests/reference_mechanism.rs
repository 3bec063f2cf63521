//! Regression checks on the reference dosing mechanism.
//!
//! r = 84.01 mm, L = 210 mm, h = 347.46 mm, crank center 591.47 mm above the
//! soil, rod 1.16094 kg, link 0.75022 kg, g = 9.81 m/s², swept over
//! 0°..360° in 361 points.

use approx::{assert_abs_diff_eq, assert_relative_eq};

use doser_calc::analysis::{GroundModel, kinematic_analysis, torque_analysis};
use doser_calc::kinematics::{angular_speed, omega_to_rpm};
use doser_calc::metrics::peak_abs;
use doser_calc::{
    AngleSweep, CropCatalog, ForceTorqueEngine, Geometry, GroundContactSolver, GroundForceParams,
    GroundLoad, KinematicState, KinematicsEngine, LengthUnit, LoadCase, MechanismConfig,
    build_variable_ground_force, seeds_per_meter, spacing,
};

const OMEGA: f64 = 20.0;

#[test]
fn test_contact_angles() {
    let contact = GroundContactSolver::new(Geometry::reference()).find().unwrap();
    assert_abs_diff_eq!(contact.descent_deg, 123.282_303, epsilon = 1e-5);
    assert_abs_diff_eq!(contact.ascent_deg, 236.717_697, epsilon = 1e-5);
}

#[test]
fn test_ground_force_curve() {
    let curve = build_variable_ground_force(
        &AngleSweep::full_turn(),
        &Geometry::reference(),
        &GroundForceParams::default(),
    )
    .unwrap();
    assert_eq!(curve.theta_peak_deg, 168.0);
    assert_relative_eq!(curve.max_force, 419.248_248_082_832_4, max_relative = 1e-10);
}

#[test]
fn test_pin_force_and_torque_peaks() {
    let sweep = AngleSweep::full_turn();
    let geometry = Geometry::reference();
    let curve =
        build_variable_ground_force(&sweep, &geometry, &GroundForceParams::default()).unwrap();
    let engine = ForceTorqueEngine::new(&geometry, LoadCase::reference());
    let result = engine
        .analyze(&sweep, &GroundLoad::from(&curve), OMEGA, None)
        .unwrap();

    let rod = peak_abs(&result.theta_deg, &result.rod_force).unwrap();
    assert_eq!(rod.theta_deg, 168.0);
    assert_abs_diff_eq!(rod.value, 361.652_39, epsilon = 1e-4);

    let crank = peak_abs(&result.theta_deg, &result.crank_force).unwrap();
    assert_eq!(crank.theta_deg, 168.0);
    assert_abs_diff_eq!(crank.value, -373.844_86, epsilon = 1e-4);

    let torque = peak_abs(&result.theta_deg, &result.torque).unwrap();
    assert_eq!(torque.theta_deg, 158.0);
    assert_abs_diff_eq!(torque.value, -12.001_541, epsilon = 1e-5);
}

#[test]
fn test_unloaded_peaks() {
    let analysis = torque_analysis(
        &MechanismConfig::default(),
        &AngleSweep::full_turn(),
        OMEGA,
        GroundModel::None,
    )
    .unwrap();
    assert_eq!(analysis.summary.rod_force.theta_deg, 180.0);
    assert_abs_diff_eq!(analysis.summary.rod_force.value, -66.007_798, epsilon = 1e-5);
    // the unloaded torque peaks twice, symmetrically about bottom dead center
    let torque = analysis.summary.torque;
    assert!(torque.theta_deg == 144.0 || torque.theta_deg == 216.0);
    assert_abs_diff_eq!(torque.abs(), 2.513_030, epsilon = 1e-5);
}

#[test]
fn test_soil_raises_peak_torque() {
    let analysis = torque_analysis(
        &MechanismConfig::default(),
        &AngleSweep::full_turn(),
        OMEGA,
        GroundModel::Variable,
    )
    .unwrap();
    assert_abs_diff_eq!(analysis.summary.mean_abs_torque, 1.865_944, epsilon = 1e-5);
    assert_abs_diff_eq!(analysis.ground_influence_pct.unwrap(), 377.5726, epsilon = 1e-3);
}

#[test]
fn test_kinematics_in_either_unit() {
    let sweep = AngleSweep::full_turn();
    let rates = KinematicState::constant_speed(0.0, OMEGA);
    let mm = KinematicsEngine::new(Geometry::reference())
        .profile(&sweep, rates)
        .unwrap();
    let m = KinematicsEngine::new(Geometry::reference().to_unit(LengthUnit::Meter))
        .profile(&sweep, rates)
        .unwrap();

    assert_abs_diff_eq!(mm.acceleration[0], 20_160.7998, epsilon = 1e-3);
    for i in 0..sweep.len() {
        assert_abs_diff_eq!(mm.acceleration[i] / 1000.0, m.acceleration[i], epsilon = 1e-9);
        assert_abs_diff_eq!(mm.position[i] / 1000.0, m.position[i], epsilon = 1e-12);
    }

    let analysis = kinematic_analysis(&MechanismConfig::default(), &sweep, OMEGA).unwrap();
    assert_abs_diff_eq!(analysis.summary.position_min.value, -50.0, epsilon = 1e-9);
    // in-line slider-crank: the tip travels one crank diameter
    assert_abs_diff_eq!(analysis.summary.stroke, Geometry::reference().stroke(), epsilon = 1e-9);
}

#[test]
fn test_soja_planting_chain() {
    let catalog = CropCatalog::from_toml_str(
        r#"
        [[crops]]
        name = "Soja"
        row_spacing_m = [0.45, 0.50]
        plant_density_per_hectare = { min = 250000, max = 400000 }
        planting_speed_kmh = { min = 5.0, max = 7.0 }
        germination_rate = { min = 85, max = 95 }
        "#,
    )
    .unwrap();
    let soja = catalog.get("soja").unwrap();

    let n = soja.seeds_per_meter().unwrap();
    assert_relative_eq!(n, seeds_per_meter(250_000.0, 400_000.0, 0.85, 0.95).unwrap());
    let omega = angular_speed(7.0, n);
    assert_relative_eq!(omega, 220.590_224_904_838_86, max_relative = 1e-12);
    assert_relative_eq!(omega_to_rpm(omega), 2106.481_481_481_481, max_relative = 1e-9);

    let row = spacing(n, 3.0).unwrap();
    assert_eq!(row.total_seeds, 54);
    assert_relative_eq!(row.spacing_cm, 300.0 / 54.0, max_relative = 1e-12);
}

#[test]
fn test_shipped_config_files() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");

    let config = MechanismConfig::from_file(root.join("mechanism.toml")).unwrap();
    assert_eq!(config, MechanismConfig::default());

    let catalog = CropCatalog::from_file(root.join("crops.toml")).unwrap();
    assert_eq!(catalog.names(), vec!["soja", "milho", "feijao"]);
    let (fastest, omega) = catalog.fastest().unwrap().unwrap();
    assert_eq!(fastest.name, "soja");
    assert_relative_eq!(omega, 220.590_224_904_838_86, max_relative = 1e-12);
}
