//! Slider-crank geometry.
//!
//! The crank of radius `r` turns about its center; a connecting link of
//! length `L` drives the dosing rod along the vertical. With the crank angle
//! `θ` measured from the vertical, the rod-tip distance from the crank
//! center, counted downwards towards the soil, is
//!
//! ```text
//! y(θ) = sqrt(L² − (r·sinθ)²) − r·cosθ + h
//! ```
//!
//! Lengths carry an explicit [`LengthUnit`]. Rescaling only happens through
//! [`Geometry::to_unit`]; the formulas below never convert on their own.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, ValidationError};

/// Unit in which a [`Geometry`] stores its lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Millimeters.
    Millimeter,
    /// Meters.
    Meter,
}

impl LengthUnit {
    /// How many of this unit make one meter.
    pub const fn per_meter(self) -> f64 {
        match self {
            LengthUnit::Millimeter => 1000.0,
            LengthUnit::Meter => 1.0,
        }
    }

    /// Short symbol for reports.
    pub const fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Meter => "m",
        }
    }
}

/// Validated, unit-tagged mechanism geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    crank_radius: f64,
    rod_length: f64,
    offset: f64,
    center_height: f64,
    unit: LengthUnit,
}

impl Geometry {
    /// Build a geometry, rejecting anything that is not a proper slider-crank.
    ///
    /// `center_height` is the height of the crank center above the soil.
    /// It may be any finite value; the other three lengths must be positive
    /// and the rod must be longer than the crank.
    pub fn new(
        crank_radius: f64,
        rod_length: f64,
        offset: f64,
        center_height: f64,
        unit: LengthUnit,
    ) -> Result<Self, GeometryError> {
        for (name, value) in [
            ("crank radius", crank_radius),
            ("rod length", rod_length),
            ("offset", offset),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::NonPositiveLength { name, value });
            }
        }
        if !center_height.is_finite() {
            return Err(GeometryError::NonFinite {
                name: "center height",
                value: center_height,
            });
        }
        if rod_length <= crank_radius {
            return Err(GeometryError::RodTooShort {
                rod_length,
                crank_radius,
            });
        }

        Ok(Self {
            crank_radius,
            rod_length,
            offset,
            center_height,
            unit,
        })
    }

    /// The reference dosing mechanism, in millimeters.
    pub const fn reference() -> Self {
        Self {
            crank_radius: 84.01,
            rod_length: 210.0,
            offset: 347.46,
            center_height: 591.47,
            unit: LengthUnit::Millimeter,
        }
    }

    /// Same geometry expressed in another unit.
    pub fn to_unit(&self, unit: LengthUnit) -> Self {
        if unit == self.unit {
            return *self;
        }
        let factor = unit.per_meter() / self.unit.per_meter();
        Self {
            crank_radius: self.crank_radius * factor,
            rod_length: self.rod_length * factor,
            offset: self.offset * factor,
            center_height: self.center_height * factor,
            unit,
        }
    }

    /// Crank radius r.
    pub const fn crank_radius(&self) -> f64 {
        self.crank_radius
    }

    /// Connecting link length L.
    pub const fn rod_length(&self) -> f64 {
        self.rod_length
    }

    /// Offset h between link pin and rod tip.
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Crank center height above the soil.
    pub const fn center_height(&self) -> f64 {
        self.center_height
    }

    /// Unit of every length above.
    pub const fn unit(&self) -> LengthUnit {
        self.unit
    }

    /// Total rod-tip travel per crank turn (2·r).
    pub fn stroke(&self) -> f64 {
        2.0 * self.crank_radius
    }

    /// `L² − r²·sin²θ`, the quantity under every square root of the model.
    #[inline(always)]
    pub fn radicand(&self, theta: f64) -> f64 {
        let rs = self.crank_radius * theta.sin();
        self.rod_length * self.rod_length - rs * rs
    }

    /// `sqrt(L² − r²·sin²θ)`, with the domain checked.
    #[inline(always)]
    pub(crate) fn root(&self, theta: f64) -> Result<f64, GeometryError> {
        if !theta.is_finite() {
            return Err(GeometryError::InvalidAngle(theta));
        }
        let radicand = self.radicand(theta);
        if radicand < 0.0 {
            return Err(GeometryError::NegativeRadicand { theta, radicand });
        }
        Ok(radicand.sqrt())
    }

    /// Rod-tip distance below the crank center.
    pub fn position(&self, theta: f64) -> Result<f64, GeometryError> {
        Ok(self.root(theta)? - self.crank_radius * theta.cos() + self.offset)
    }

    /// Angle β between the connecting link and the vertical.
    pub fn rod_angle(&self, theta: f64) -> Result<f64, GeometryError> {
        let cos_beta = self.root(theta)? / self.rod_length;
        let sin_beta = self.crank_radius * theta.sin() / self.rod_length;
        Ok(sin_beta.atan2(cos_beta))
    }

    /// `cos β = sqrt(L² − r²·sin²θ) / L`.
    pub fn cos_rod_angle(&self, theta: f64) -> Result<f64, GeometryError> {
        Ok(self.root(theta)? / self.rod_length)
    }

    /// Rod-tip height relative to the soil.
    ///
    /// Zero touches the ground, negative values are penetration depth.
    pub fn ground_relative_position(&self, theta: f64) -> Result<f64, GeometryError> {
        Ok(self.center_height - self.position(theta)?)
    }

    /// Rod-tip positions over a whole sweep.
    pub fn positions(&self, sweep: &AngleSweep) -> Result<Array1<f64>, GeometryError> {
        map_sweep(sweep, |theta| self.position(theta))
    }

    /// Ground-relative rod-tip positions over a whole sweep.
    pub fn ground_profile(&self, sweep: &AngleSweep) -> Result<Array1<f64>, GeometryError> {
        map_sweep(sweep, |theta| self.ground_relative_position(theta))
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::reference()
    }
}

/// Evaluate a fallible per-angle function over the radians of a sweep.
pub(crate) fn map_sweep<E, F>(sweep: &AngleSweep, mut f: F) -> Result<Array1<f64>, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let values = sweep
        .radians()
        .iter()
        .map(|&theta| f(theta))
        .collect::<Result<Vec<_>, E>>()?;
    Ok(Array1::from_vec(values))
}

/// Grid of crank angles, kept in degrees with its radian image.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleSweep {
    degrees: Array1<f64>,
    radians: Array1<f64>,
}

impl AngleSweep {
    /// Evenly spaced angles from `start_deg` to `end_deg`, both included.
    pub fn uniform(start_deg: f64, end_deg: f64, points: usize) -> Result<Self, ValidationError> {
        if points < 2 {
            return Err(ValidationError::SweepTooShort { min: 2, got: points });
        }
        if !start_deg.is_finite() || !end_deg.is_finite() || end_deg <= start_deg {
            return Err(ValidationError::InvalidWindow {
                start: start_deg,
                end: end_deg,
            });
        }
        Ok(Self::from_array(Array1::linspace(start_deg, end_deg, points)))
    }

    /// One full crank turn at 1° resolution: 0°, 1°, …, 360°.
    pub fn full_turn() -> Self {
        Self::from_array(Array1::linspace(0.0, 360.0, 361))
    }

    /// Arbitrary angles in degrees.
    pub fn from_degrees(degrees: Vec<f64>) -> Result<Self, ValidationError> {
        if degrees.is_empty() {
            return Err(ValidationError::SweepTooShort { min: 1, got: 0 });
        }
        if let Some(&bad) = degrees.iter().find(|d| !d.is_finite()) {
            return Err(ValidationError::InvalidWindow {
                start: bad,
                end: bad,
            });
        }
        Ok(Self::from_array(Array1::from_vec(degrees)))
    }

    fn from_array(degrees: Array1<f64>) -> Self {
        let radians = degrees.mapv(f64::to_radians);
        Self { degrees, radians }
    }

    /// Number of angles.
    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    /// `true` for an empty sweep.
    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    /// Angles in degrees.
    pub fn degrees(&self) -> &Array1<f64> {
        &self.degrees
    }

    /// Angles in radians.
    pub fn radians(&self) -> &Array1<f64> {
        &self.radians
    }
}
