//! Crop catalog: planting parameters per crop and the crank speed they need.
//!
//! The catalog is a TOML document with one `[[crops]]` table per crop:
//!
//! ```toml
//! [[crops]]
//! name = "Soja"
//! row_spacing_m = [0.45, 0.50]
//! plant_density_per_hectare = { min = 250000, max = 400000, step = 25000 }
//! planting_speed_kmh = { min = 5.0, max = 7.0, step = 0.5 }
//! germination_rate = { min = 0.85, max = 0.95, step = 0.01 }
//! ```
//!
//! `row_spacing_m` may also be written as `{ options = [0.45, 0.50] }`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DomainError};
use crate::kinematics::angular_speed;
use crate::spacing::seeds_per_meter;

/// A `{min, max, step}` block of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Increment used by interactive pickers; unused by the models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl ParamRange {
    fn validate(&self, crop: &str, field: &str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::InvalidValue {
                field: format!("{crop}.{field}"),
                message: format!("expected finite min <= max, got [{}, {}]", self.min, self.max),
            });
        }
        Ok(())
    }
}

/// Planting parameters of one crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRecord {
    /// Normalized name (lowercase, no diacritics).
    pub name: String,
    /// Row spacings the crop is planted at (m).
    pub row_spacing_m: Vec<f64>,
    /// Plants per hectare.
    pub plant_density: ParamRange,
    /// Tractor speed while planting.
    pub planting_speed_kmh: ParamRange,
    /// Germination, as a fraction or a percentage.
    pub germination_rate: ParamRange,
}

impl CropRecord {
    /// Seeds per meter from the density and germination ranges.
    pub fn seeds_per_meter(&self) -> Result<f64, DomainError> {
        seeds_per_meter(
            self.plant_density.min,
            self.plant_density.max,
            self.germination_rate.min,
            self.germination_rate.max,
        )
    }

    /// Crank speed (rad/s) at the crop's maximum planting speed.
    pub fn angular_speed(&self) -> Result<f64, DomainError> {
        Ok(angular_speed(self.planting_speed_kmh.max, self.seeds_per_meter()?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowSpacing {
    List(Vec<f64>),
    Options { options: Vec<f64> },
}

#[derive(Debug, Deserialize)]
struct RawCrop {
    name: Option<String>,
    row_spacing_m: Option<RowSpacing>,
    plant_density_per_hectare: Option<ParamRange>,
    planting_speed_kmh: Option<ParamRange>,
    germination_rate: Option<ParamRange>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    crops: Vec<RawCrop>,
}

fn required(crop: &str, field: &str, value: Option<ParamRange>) -> Result<ParamRange, ConfigError> {
    let range = value.ok_or_else(|| ConfigError::InvalidValue {
        field: format!("{crop}.{field}"),
        message: "block needs 'min' and 'max' keys".to_string(),
    })?;
    range.validate(crop, field)?;
    Ok(range)
}

impl RawCrop {
    fn into_record(self) -> Result<Option<CropRecord>, ConfigError> {
        let Some(name) = self.name else {
            tracing::warn!("skipping crop entry without a name");
            return Ok(None);
        };
        let name = normalize_name(&name);

        let row_spacing_m = match self.row_spacing_m {
            Some(RowSpacing::List(values)) | Some(RowSpacing::Options { options: values }) => values,
            None => Vec::new(),
        };

        Ok(Some(CropRecord {
            plant_density: required(&name, "plant_density_per_hectare", self.plant_density_per_hectare)?,
            planting_speed_kmh: required(&name, "planting_speed_kmh", self.planting_speed_kmh)?,
            germination_rate: required(&name, "germination_rate", self.germination_rate)?,
            row_spacing_m,
            name,
        }))
    }
}

/// Ordered set of crops.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CropCatalog {
    crops: Vec<CropRecord>,
}

impl CropCatalog {
    /// Catalog from already validated records. Fails when empty.
    pub fn new(crops: Vec<CropRecord>) -> Result<Self, ConfigError> {
        if crops.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Ok(Self { crops })
    }

    /// Parse a `[[crops]]` TOML document. Malformed entries are skipped.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawCatalog = toml::from_str(content)?;
        let mut crops = Vec::with_capacity(raw.crops.len());
        for entry in raw.crops {
            if let Some(record) = entry.into_record()? {
                crops.push(record);
            }
        }
        tracing::debug!(crops = crops.len(), "crop catalog parsed");
        Self::new(crops)
    }

    /// Read and parse a catalog file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Look a crop up by name, ignoring case and diacritics.
    pub fn get(&self, name: &str) -> Result<&CropRecord, ConfigError> {
        let key = normalize_name(name);
        self.crops
            .iter()
            .find(|crop| crop.name == key)
            .ok_or_else(|| ConfigError::UnknownCrop {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Normalized crop names, in catalog order.
    pub fn names(&self) -> Vec<&str> {
        self.crops.iter().map(|crop| crop.name.as_str()).collect()
    }

    /// Records in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &CropRecord> {
        self.crops.iter()
    }

    /// Number of crops.
    pub fn len(&self) -> usize {
        self.crops.len()
    }

    /// `true` for an empty catalog.
    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }

    /// The crop demanding the highest crank speed, with that speed.
    pub fn fastest(&self) -> Result<Option<(&CropRecord, f64)>, DomainError> {
        let mut best: Option<(&CropRecord, f64)> = None;
        for crop in &self.crops {
            let omega = crop.angular_speed()?;
            if best.is_none_or(|(_, top)| omega > top) {
                best = Some((crop, omega));
            }
        }
        Ok(best)
    }
}

/// Lowercase, trimmed, with Portuguese diacritics folded ("Feijão" → "feijao").
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CATALOG: &str = r#"
        [[crops]]
        name = "Soja"
        row_spacing_m = [0.45, 0.50]
        plant_density_per_hectare = { min = 250000, max = 400000, step = 25000 }
        planting_speed_kmh = { min = 5.0, max = 7.0, step = 0.5 }
        germination_rate = { min = 0.85, max = 0.95, step = 0.01 }

        [[crops]]
        name = "Feijão"
        row_spacing_m = { options = [0.45, 0.50] }
        plant_density_per_hectare = { min = 200000, max = 300000 }
        planting_speed_kmh = { min = 4.0, max = 6.0 }
        germination_rate = { min = 80, max = 90 }
    "#;

    #[test]
    fn test_parse_catalog() {
        let catalog = CropCatalog::from_toml_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names(), vec!["soja", "feijao"]);
        let soja = catalog.get("SOJA ").unwrap();
        assert_eq!(soja.row_spacing_m, vec![0.45, 0.50]);
        assert_eq!(soja.plant_density.step, Some(25000.0));
        let feijao = catalog.get("feijão").unwrap();
        assert_eq!(feijao.row_spacing_m, vec![0.45, 0.50]);
        assert_eq!(feijao.germination_rate.step, None);
    }

    #[test]
    fn test_unknown_crop_lists_available() {
        let catalog = CropCatalog::from_toml_str(CATALOG).unwrap();
        let err = catalog.get("milho").unwrap_err();
        match err {
            ConfigError::UnknownCrop { available, .. } => assert_eq!(available, "soja, feijao"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_soja_angular_speed() {
        let catalog = CropCatalog::from_toml_str(CATALOG).unwrap();
        let soja = catalog.get("soja").unwrap();
        assert_relative_eq!(soja.seeds_per_meter().unwrap(), 650_000.0 / 40_000.0 / 0.9, max_relative = 1e-12);
        assert_relative_eq!(soja.angular_speed().unwrap(), 220.590_224_904_838_86, max_relative = 1e-12);
    }

    #[test]
    fn test_fastest_crop() {
        let catalog = CropCatalog::from_toml_str(CATALOG).unwrap();
        let (crop, omega) = catalog.fastest().unwrap().unwrap();
        assert_eq!(crop.name, "soja");
        assert!(omega > catalog.get("feijao").unwrap().angular_speed().unwrap());
    }

    #[test]
    fn test_missing_block_is_config_error() {
        let doc = r#"
            [[crops]]
            name = "milho"
            planting_speed_kmh = { min = 5.0, max = 7.0 }
            germination_rate = { min = 0.85, max = 0.95 }
        "#;
        let err = CropCatalog::from_toml_str(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "milho.plant_density_per_hectare"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let doc = r#"
            [[crops]]
            name = "milho"
            plant_density_per_hectare = { min = 80000, max = 60000 }
            planting_speed_kmh = { min = 5.0, max = 7.0 }
            germination_rate = { min = 0.85, max = 0.95 }
        "#;
        assert!(CropCatalog::from_toml_str(doc).is_err());
    }

    #[test]
    fn test_unnamed_entries_skipped_and_empty_rejected() {
        let doc = r#"
            [[crops]]
            planting_speed_kmh = { min = 5.0, max = 7.0 }
        "#;
        assert!(matches!(
            CropCatalog::from_toml_str(doc),
            Err(ConfigError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Feijão "), "feijao");
        assert_eq!(normalize_name("AMENDOIM"), "amendoim");
        assert_eq!(normalize_name("Algodão"), "algodao");
    }
}
