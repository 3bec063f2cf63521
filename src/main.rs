//! Seed doser analysis CLI.
//!
//! - `kinematics`: contact angles and rod-tip kinematics per crop
//! - `torque`: soil load, pin forces and crank torque
//! - `spacing`: seed count and spacing along the row
//! - `crops`: crank speed demanded by each crop
//! - `config`: the mechanism configuration in use

mod export;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use doser_calc::analysis::{GroundModel, kinematic_analysis, torque_analysis};
use doser_calc::kinematics::omega_to_rpm;
use doser_calc::spacing::{DEFAULT_ROW_DISTANCE_M, spacing_for_crops};
use doser_calc::{AngleSweep, CropCatalog, MechanismConfig};

/// Crank speed used when neither a crop nor a speed is given (rad/s).
const TEST_OMEGA: f64 = 20.0;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Kinematics and crank torque of a slider-crank seed doser.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Mechanism configuration (TOML). The reference mechanism when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Crop catalog (TOML).
    #[arg(long, global = true, default_value = "config/crops.toml")]
    crops: PathBuf,

    /// Number of crank angles between 0° and 360°.
    #[arg(long, global = true, default_value_t = 361)]
    points: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Contact angles and rod-tip kinematics.
    Kinematics {
        /// Crops to analyze; all catalog crops when omitted.
        #[arg(long)]
        crop: Vec<String>,

        /// Crank speed in rad/s, overriding any crop.
        #[arg(long)]
        omega: Option<f64>,

        /// Write the profile to CSV (one file per crop when several).
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Pin forces and crank torque.
    Torque {
        /// Take the crank speed from this crop.
        #[arg(long, conflicts_with_all = ["omega", "fastest"])]
        crop: Option<String>,

        /// Crank speed in rad/s.
        #[arg(long, conflicts_with = "fastest")]
        omega: Option<f64>,

        /// Use the highest crank speed of the catalog.
        #[arg(long)]
        fastest: bool,

        /// Constant soil reaction (N) instead of the piecewise model.
        #[arg(long, conflicts_with = "no_ground")]
        constant_force: Option<f64>,

        /// Ignore the soil reaction.
        #[arg(long)]
        no_ground: bool,

        /// Write forces and torque to CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Seed spacing along the row.
    Spacing {
        /// Row length in meters.
        #[arg(long, default_value_t = DEFAULT_ROW_DISTANCE_M)]
        distance: f64,

        /// Only this crop.
        #[arg(long)]
        crop: Option<String>,

        /// Write seed positions to CSV (requires --crop).
        #[arg(long, requires = "crop")]
        csv: Option<PathBuf>,
    },

    /// Crank speed per crop.
    Crops,

    /// Print the mechanism configuration.
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let config = match &cli.config {
        Some(path) => MechanismConfig::from_file(path)?,
        None => MechanismConfig::default(),
    };
    let sweep = || AngleSweep::uniform(0.0, 360.0, cli.points);

    match cli.command {
        Commands::Kinematics { crop, omega, csv } => {
            let runs = match omega {
                Some(omega) => vec![("manual".to_string(), omega)],
                None => crop_speeds(&CropCatalog::from_file(&cli.crops)?, &crop)?,
            };
            run_kinematics(&config, &sweep()?, &runs, csv.as_deref())
        }
        Commands::Torque {
            crop,
            omega,
            fastest,
            constant_force,
            no_ground,
            csv,
        } => {
            let omega = match (crop, omega, fastest) {
                (Some(name), _, _) => CropCatalog::from_file(&cli.crops)?.get(&name)?.angular_speed()?,
                (None, Some(omega), _) => omega,
                (None, None, true) => {
                    let catalog = CropCatalog::from_file(&cli.crops)?;
                    let (crop, omega) = catalog.fastest()?.ok_or("empty crop catalog")?;
                    println!("Fastest crop: {}", crop.name);
                    omega
                }
                (None, None, false) => TEST_OMEGA,
            };
            let model = match (constant_force, no_ground) {
                (Some(force), _) => GroundModel::Constant(force),
                (None, true) => GroundModel::None,
                (None, false) => GroundModel::Variable,
            };
            run_torque(&config, &sweep()?, omega, model, csv.as_deref())
        }
        Commands::Spacing { distance, crop, csv } => {
            run_spacing(&CropCatalog::from_file(&cli.crops)?, distance, crop.as_deref(), csv.as_deref())
        }
        Commands::Crops => run_crops(&CropCatalog::from_file(&cli.crops)?),
        Commands::Config => {
            println!("Mechanism configuration:");
            for (k, v) in config.summary() {
                println!("  {k}: {v}");
            }
            println!();
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn crop_speeds(catalog: &CropCatalog, names: &[String]) -> CliResult<Vec<(String, f64)>> {
    let crops = if names.is_empty() {
        catalog.iter().collect::<Vec<_>>()
    } else {
        names
            .iter()
            .map(|name| catalog.get(name))
            .collect::<Result<Vec<_>, _>>()?
    };
    crops
        .into_iter()
        .map(|crop| -> CliResult<(String, f64)> { Ok((crop.name.clone(), crop.angular_speed()?)) })
        .collect()
}

fn run_kinematics(
    config: &MechanismConfig,
    sweep: &AngleSweep,
    runs: &[(String, f64)],
    csv: Option<&Path>,
) -> CliResult {
    for (label, omega) in runs {
        let analysis = kinematic_analysis(config, sweep, *omega)?;
        let s = &analysis.summary;

        println!("{}:", label.to_uppercase());
        println!("  Omega: {:.2} rad/s ({:.0} RPM)", omega, omega_to_rpm(*omega));
        println!("  Descent angle: {:.2}°", analysis.contact.descent_deg);
        println!("  Ascent angle: {:.2}°", analysis.contact.ascent_deg);
        println!("  Stroke: {:.2} mm, max depth {:.2} mm", s.stroke, s.max_depth);
        println!("  |v| max: {:.1} mm/s at {:.0}°", s.velocity.abs(), s.velocity.theta_deg);
        println!("  |a| max: {:.1} mm/s² at {:.0}°", s.acceleration.abs(), s.acceleration.theta_deg);
        println!("  |j| max: {:.1} mm/s³ at {:.0}°", s.jerk.abs(), s.jerk.theta_deg);

        if let Some(path) = csv {
            let path = if runs.len() > 1 {
                suffixed(path, label)
            } else {
                path.to_path_buf()
            };
            export::write_csv(&mut export::kinematics_frame(&analysis.profile)?, &path)?;
            println!("  CSV: {}", path.display());
        }
    }
    Ok(())
}

fn run_torque(
    config: &MechanismConfig,
    sweep: &AngleSweep,
    omega: f64,
    model: GroundModel,
    csv: Option<&Path>,
) -> CliResult {
    let analysis = torque_analysis(config, sweep, omega, model)?;
    let s = &analysis.summary;

    println!("Omega: {:.2} rad/s ({:.0} RPM)", omega, omega_to_rpm(omega));
    if let Some(curve) = &analysis.curve {
        let (start, end) = curve.band();
        println!("Soil model:");
        println!("  θ start: {start:.2}°");
        println!("  θ peak: {:.2}°", curve.theta_peak_deg);
        println!("  θ end: {end:.2}°");
        println!("  F max: {:.2} N", curve.max_force);
        println!("  Target depth: {:.2} mm", curve.params.target_depth_mm);
    }

    println!("Results:");
    println!("  Max torque |τ|: {:.4} N·m", s.torque.abs());
    println!("    at θ = {:.2}° (τ = {:.4} N·m)", s.torque.theta_deg, s.torque.value);
    println!("  Min torque |τ|: {:.4} N·m at θ = {:.2}°", s.torque_min_abs.abs(), s.torque_min_abs.theta_deg);
    println!("  Mean |τ|: {:.4} N·m", s.mean_abs_torque);
    println!("  Max F_B: {:.2} N at θ = {:.2}°", s.rod_force.abs(), s.rod_force.theta_deg);
    println!("  Max F_M: {:.2} N at θ = {:.2}°", s.crank_force.abs(), s.crank_force.theta_deg);
    if let Some(pct) = analysis.ground_influence_pct {
        println!("  Soil adds {pct:.1}% to peak torque");
    }

    if let Some(path) = csv {
        export::write_csv(&mut export::forces_frame(&analysis.result)?, path)?;
        println!("CSV: {}", path.display());
    }
    Ok(())
}

fn run_spacing(
    catalog: &CropCatalog,
    distance: f64,
    crop: Option<&str>,
    csv: Option<&Path>,
) -> CliResult {
    let rows = match crop {
        Some(name) => {
            let record = catalog.get(name)?;
            vec![(record.name.clone(), doser_calc::spacing(record.seeds_per_meter()?, distance)?)]
        }
        None => spacing_for_crops(catalog, distance)?,
    };

    println!("{:<12} {:>10} {:>8} {:>12}", "crop", "seeds/m", "seeds", "spacing cm");
    for (name, s) in &rows {
        println!(
            "{:<12} {:>10.2} {:>8} {:>12.2}",
            name, s.seeds_per_meter, s.total_seeds, s.spacing_cm
        );
    }

    if let (Some(path), [(_, s)]) = (csv, rows.as_slice()) {
        export::write_csv(&mut export::spacing_frame(s)?, path)?;
        println!("CSV: {}", path.display());
    }
    Ok(())
}

fn run_crops(catalog: &CropCatalog) -> CliResult {
    println!("Angular speed per crop:");
    for crop in catalog.iter() {
        let omega = crop.angular_speed()?;
        println!(
            "  {:12} - {:.2} rad/s ({:.0} RPM) @ {:.1} km/h",
            crop.name,
            omega,
            omega_to_rpm(omega),
            crop.planting_speed_kmh.max
        );
    }
    if let Some((crop, omega)) = catalog.fastest()? {
        println!("Fastest: {} ({:.2} rad/s)", crop.name, omega);
    }
    Ok(())
}

/// `out.csv` + `soja` → `out_soja.csv`.
fn suffixed(path: &Path, label: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("profile");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    path.with_file_name(format!("{stem}_{label}.{ext}"))
}
