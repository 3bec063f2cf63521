//! CSV export of angle-indexed results.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use doser_calc::{ForceTorqueResult, KinematicProfile, SeedSpacing};

pub fn kinematics_frame(profile: &KinematicProfile) -> PolarsResult<DataFrame> {
    df!(
        "theta_deg" => profile.theta_deg.to_vec(),
        "position" => profile.position.to_vec(),
        "velocity" => profile.velocity.to_vec(),
        "acceleration" => profile.acceleration.to_vec(),
        "jerk" => profile.jerk.to_vec()
    )
}

pub fn forces_frame(result: &ForceTorqueResult) -> PolarsResult<DataFrame> {
    df!(
        "theta_deg" => result.theta_deg.to_vec(),
        "ground_force" => result.ground_force.to_vec(),
        "rod_force" => result.rod_force.to_vec(),
        "crank_force" => result.crank_force.to_vec(),
        "torque" => result.torque.to_vec()
    )
}

pub fn spacing_frame(spacing: &SeedSpacing) -> PolarsResult<DataFrame> {
    let seed: Vec<u32> = (1..=spacing.total_seeds as u32).collect();
    df!(
        "seed" => seed,
        "position_m" => spacing.positions.to_vec()
    )
}

pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    tracing::info!(path = %path.display(), rows = df.height(), "CSV written");
    Ok(())
}
