//! Mechanism configuration.
//!
//! A [`MechanismConfig`] is an immutable value: reconfiguring produces a new
//! config through [`MechanismConfig::with_geometry`] or
//! [`MechanismConfig::with_masses`]. Lengths are stored in millimeters, as
//! they are measured on the machine, and converted once in
//! [`MechanismConfig::geometry`].
//!
//! ```toml
//! gravity = 9.81
//!
//! [geometry]
//! crank_radius_mm = 84.01
//! rod_length_mm = 210.0
//! offset_mm = 347.46
//! center_height_mm = 591.47
//!
//! [masses]
//! rod_kg = 1.16094
//! link_kg = 0.75022
//! ```
//!
//! `[geometry]` and `[masses]` are required and every key in them must be
//! present. `gravity`, `[ground_force]` and `[solver]` fall back to their
//! defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::contact::SolverOptions;
use crate::error::{ConfigError, GeometryError};
use crate::forces::{LoadCase, STANDARD_GRAVITY};
use crate::geometry::{Geometry, LengthUnit};
use crate::ground_force::GroundForceParams;

fn default_gravity() -> f64 {
    STANDARD_GRAVITY
}

/// Mechanism lengths as measured (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometryConfig {
    /// Crank radius r.
    pub crank_radius_mm: f64,
    /// Connecting link length L.
    pub rod_length_mm: f64,
    /// Vertical offset h of the rod tip below the link pin.
    pub offset_mm: f64,
    /// Crank center above the soil.
    pub center_height_mm: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        let g = Geometry::reference();
        Self {
            crank_radius_mm: g.crank_radius(),
            rod_length_mm: g.rod_length(),
            offset_mm: g.offset(),
            center_height_mm: g.center_height(),
        }
    }
}

/// Moving masses (kg).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MassConfig {
    /// Dosing rod.
    pub rod_kg: f64,
    /// Connecting link.
    pub link_kg: f64,
}

impl Default for MassConfig {
    fn default() -> Self {
        let loads = LoadCase::reference();
        Self {
            rod_kg: loads.rod_mass,
            link_kg: loads.link_mass,
        }
    }
}

/// Everything needed to analyze one mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismConfig {
    /// Gravitational acceleration (m/s²).
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Crank and link dimensions.
    pub geometry: GeometryConfig,
    /// Moving masses.
    pub masses: MassConfig,
    /// Soil model parameters.
    #[serde(default)]
    pub ground_force: GroundForceParams,
    /// Contact root-finder tuning.
    #[serde(default)]
    pub solver: SolverOptions,
}

impl Default for MechanismConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            geometry: GeometryConfig::default(),
            masses: MassConfig::default(),
            ground_force: GroundForceParams::default(),
            solver: SolverOptions::default(),
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

impl MechanismConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "mechanism configuration loaded");
        Ok(config)
    }

    /// Checks every value for physical sense, naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry(LengthUnit::Millimeter)
            .map_err(|e| invalid("geometry", e.to_string()))?;

        for (field, value) in [
            ("masses.rod_kg", self.masses.rod_kg),
            ("masses.link_kg", self.masses.link_kg),
            ("gravity", self.gravity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("must be finite and positive, got {value}")));
            }
        }

        self.ground_force
            .validate()
            .map_err(|e| invalid("ground_force", e.to_string()))?;

        let solver = &self.solver;
        if !solver.tolerance.is_finite() || solver.tolerance <= 0.0 {
            return Err(invalid("solver.tolerance", "must be finite and positive"));
        }
        if solver.max_iterations == 0 {
            return Err(invalid("solver.max_iterations", "must be at least 1"));
        }
        if !solver.fallback_half_width_deg.is_finite() || solver.fallback_half_width_deg <= 0.0 {
            return Err(invalid("solver.fallback_half_width_deg", "must be finite and positive"));
        }
        Ok(())
    }

    /// The mechanism geometry in `unit`.
    pub fn geometry(&self, unit: LengthUnit) -> Result<Geometry, GeometryError> {
        let g = &self.geometry;
        Ok(Geometry::new(
            g.crank_radius_mm,
            g.rod_length_mm,
            g.offset_mm,
            g.center_height_mm,
            LengthUnit::Millimeter,
        )?
        .to_unit(unit))
    }

    /// Masses and weights under the configured gravity.
    pub fn load_case(&self) -> LoadCase {
        LoadCase::from_masses(self.masses.rod_kg, self.masses.link_kg, self.gravity)
    }

    /// A copy with new lengths, validated.
    pub fn with_geometry(&self, geometry: GeometryConfig) -> Result<Self, ConfigError> {
        let config = Self {
            geometry,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// A copy with new masses, validated.
    pub fn with_masses(&self, masses: MassConfig) -> Result<Self, ConfigError> {
        let config = Self {
            masses,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| invalid("config", e.to_string()))
    }

    /// Human-readable key/value summary for reports.
    pub fn summary(&self) -> BTreeMap<String, String> {
        let g = &self.geometry;
        let loads = self.load_case();
        let mut map = BTreeMap::new();
        map.insert("r (mm)".to_string(), format!("{:.2}", g.crank_radius_mm));
        map.insert("L (mm)".to_string(), format!("{:.2}", g.rod_length_mm));
        map.insert("h (mm)".to_string(), format!("{:.2}", g.offset_mm));
        map.insert("center height (mm)".to_string(), format!("{:.2}", g.center_height_mm));
        map.insert("rod mass (kg)".to_string(), format!("{:.5}", self.masses.rod_kg));
        map.insert("link mass (kg)".to_string(), format!("{:.5}", self.masses.link_kg));
        map.insert("rod weight (N)".to_string(), format!("{:.4}", loads.rod_weight));
        map.insert("link weight (N)".to_string(), format!("{:.4}", loads.link_weight));
        map.insert("g (m/s²)".to_string(), format!("{:.4}", self.gravity));
        map
    }
}
