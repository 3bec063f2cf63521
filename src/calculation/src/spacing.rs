//! Seed distribution along a planting row.

use ndarray::Array1;

use crate::crops::CropCatalog;
use crate::error::DomainError;

/// Plants per hectare to plants per linear meter for the assumed row layout.
pub const PLANTS_PER_HECTARE_TO_METER: f64 = 40_000.0;

/// Default row length over which seed positions are laid out (m).
pub const DEFAULT_ROW_DISTANCE_M: f64 = 3.0;

/// Most seeds a single stretch of row may hold.
pub const MAX_SEEDS: f64 = u32::MAX as f64;

/// Germination rates above 1 are read as percentages.
#[inline(always)]
fn as_fraction(rate: f64) -> f64 {
    if rate > 1.0 { rate / 100.0 } else { rate }
}

/// Seeds to drop per linear meter.
///
/// `N = ((min_plants + max_plants) / 40000) / ((min_germ + max_germ) / 2)`
///
/// Densities are in plants per hectare. Germination may be given either as
/// fractions (0.85) or as percentages (85).
pub fn seeds_per_meter(
    min_plants: f64,
    max_plants: f64,
    min_germination: f64,
    max_germination: f64,
) -> Result<f64, DomainError> {
    let min_germination = as_fraction(min_germination);
    let max_germination = as_fraction(max_germination);
    let mean_germination = (min_germination + max_germination) / 2.0;
    if mean_germination.is_nan() || mean_germination <= 0.0 {
        return Err(DomainError::NonPositiveGermination {
            min: min_germination,
            max: max_germination,
        });
    }

    Ok(((min_plants + max_plants) / PLANTS_PER_HECTARE_TO_METER) / mean_germination)
}

/// Evenly spaced seeds over a stretch of row.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSpacing {
    /// Whole seeds laid over the stretch.
    pub total_seeds: usize,
    /// Seed density the layout was built from.
    pub seeds_per_meter: f64,
    /// Gap between neighbouring seeds (m).
    pub spacing_m: f64,
    /// Same gap in centimeters.
    pub spacing_cm: f64,
    /// Position of every seed from the start of the stretch (m).
    pub positions: Array1<f64>,
    /// Length of the stretch (m).
    pub distance_m: f64,
}

/// Lay `seeds_per_meter` seeds evenly over `distance_m` meters.
///
/// The seed count is truncated to a whole number; when it rounds down to zero
/// there is no spacing to speak of and a [`DomainError::NoSeeds`] is returned.
/// Counts above [`MAX_SEEDS`] are rejected with [`DomainError::TooManySeeds`].
pub fn spacing(seeds_per_meter: f64, distance_m: f64) -> Result<SeedSpacing, DomainError> {
    if !distance_m.is_finite() || distance_m <= 0.0 {
        return Err(DomainError::NonPositive {
            name: "distance",
            value: distance_m,
        });
    }
    if !seeds_per_meter.is_finite() || seeds_per_meter < 0.0 {
        return Err(DomainError::NonPositive {
            name: "seeds per meter",
            value: seeds_per_meter,
        });
    }

    let count = (seeds_per_meter * distance_m).floor();
    if count > MAX_SEEDS {
        return Err(DomainError::TooManySeeds {
            seeds_per_meter,
            distance_m,
        });
    }
    let total_seeds = count as usize;
    if total_seeds == 0 {
        return Err(DomainError::NoSeeds {
            seeds_per_meter,
            distance_m,
        });
    }

    let spacing_m = distance_m / total_seeds as f64;
    let positions = Array1::from_iter((0..total_seeds).map(|j| j as f64 * spacing_m));

    Ok(SeedSpacing {
        total_seeds,
        seeds_per_meter,
        spacing_m,
        spacing_cm: spacing_m * 100.0,
        positions,
        distance_m,
    })
}

/// Spacing for every crop of a catalog, in catalog order.
pub fn spacing_for_crops(
    catalog: &CropCatalog,
    distance_m: f64,
) -> Result<Vec<(String, SeedSpacing)>, DomainError> {
    catalog
        .iter()
        .map(|crop| {
            let n = crop.seeds_per_meter()?;
            Ok((crop.name.clone(), spacing(n, distance_m)?))
        })
        .collect()
}
