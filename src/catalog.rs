//! Fixed catalog of box sizes.
//!
//! The catalog is loaded once at start-up and never mutated afterwards. Its
//! order only matters as a deterministic tie-break between templates that
//! waste the same volume.

use std::sync::Arc;

use crate::model::{BoxTemplate, ValidationError};
use crate::types::Dimensions;

/// Ordered, read-only list of box templates.
///
/// Cloning is cheap: the templates live behind an `Arc` and are shared by all
/// packing passes.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxCatalog {
    templates: Arc<[BoxTemplate]>,
}

impl BoxCatalog {
    /// Default boxes as (name, height, width, length).
    pub const DEFAULT_TEMPLATES: [(&'static str, f64, f64, f64); 3] = [
        ("Caixa 1", 30.0, 40.0, 80.0),
        ("Caixa 2", 50.0, 50.0, 40.0),
        ("Caixa 3", 50.0, 80.0, 60.0),
    ];

    /// Creates a catalog from a non-empty list of templates.
    pub fn new(templates: Vec<BoxTemplate>) -> Result<Self, ValidationError> {
        if templates.is_empty() {
            return Err(ValidationError::InvalidConfiguration(
                "box catalog must contain at least one template".to_string(),
            ));
        }
        Ok(Self {
            templates: templates.into(),
        })
    }

    /// Parses a catalog from a JSON array of `{name, height, width, length}`.
    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        let templates: Vec<BoxTemplate> = serde_json::from_str(raw)
            .map_err(|err| ValidationError::InvalidConfiguration(err.to_string()))?;
        Self::new(templates)
    }

    pub fn templates(&self) -> &[BoxTemplate] {
        &self.templates
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Volume of the largest template.
    pub fn largest_volume(&self) -> f64 {
        self.templates
            .iter()
            .map(BoxTemplate::volume)
            .fold(0.0, f64::max)
    }
}

impl Default for BoxCatalog {
    fn default() -> Self {
        let templates = Self::DEFAULT_TEMPLATES
            .iter()
            .map(|&(name, height, width, length)| BoxTemplate {
                name: name.to_string(),
                dimensions: Dimensions::new(height, width, length)
                    .expect("default box dimensions must be valid"),
            })
            .collect::<Vec<_>>();
        Self {
            templates: templates.into(),
        }
    }
}
