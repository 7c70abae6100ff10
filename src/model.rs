//! Data models for order packaging.
//!
//! This module defines the input side of the optimizer:
//! - `Identifier`: opaque order/product id, normalized to a string
//! - `Product`: an item of an order with fixed dimensions
//! - `BoxTemplate`: a box size from the catalog
//! - `Order`: an order with its products
//!
//! All of them are read-only once constructed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Dimensions};

/// Validation error for incoming data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Opaque identifier of an order or a product.
///
/// Callers send ids either as JSON numbers or as JSON strings; both are
/// normalized to their textual form (`12345` becomes `"12345"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(from = "RawIdentifier", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the id is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawIdentifier> for Identifier {
    fn from(raw: RawIdentifier) -> Self {
        match raw {
            RawIdentifier::Text(text) => Self(text),
            RawIdentifier::Number(number) => Self(number_text(&number)),
        }
    }
}

/// Textual form of a JSON number; integer-valued floats drop the fraction.
fn number_text(number: &serde_json::Number) -> String {
    if number.is_i64() || number.is_u64() {
        return number.to_string();
    }
    match number.as_f64() {
        // f64's Display never prints a trailing ".0"
        Some(value) if value.fract() == 0.0 => format!("{}", value),
        _ => number.to_string(),
    }
}

/// A product to be packed.
///
/// # Fields
/// * `id` - Identifier, unique within its order
/// * `dimensions` - Edge lengths; the product may be rotated freely
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: Identifier,
    pub dimensions: Dimensions,
}

impl Product {
    pub fn new(id: impl Into<Identifier>, dimensions: Dimensions) -> Self {
        Self {
            id: id.into(),
            dimensions,
        }
    }

    /// Convenience constructor that validates the raw edge lengths.
    ///
    /// # Examples
    /// ```
    /// use packaging_optimizer::model::Product;
    ///
    /// let product = Product::with_dims("PROD001", 5.0, 10.0, 3.0).unwrap();
    /// assert_eq!(product.id.as_str(), "PROD001");
    /// assert!(Product::with_dims("BROKEN", -5.0, 10.0, 3.0).is_err());
    /// ```
    pub fn with_dims(
        id: impl Into<Identifier>,
        height: f64,
        width: f64,
        length: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(id, Dimensions::new(height, width, length)?))
    }
}

impl Dimensional for Product {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// A box size available for opening new boxes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawBoxTemplate")]
pub struct BoxTemplate {
    pub name: String,
    #[serde(flatten)]
    pub dimensions: Dimensions,
}

impl BoxTemplate {
    /// Creates a new template after validating the name.
    pub fn new(name: impl Into<String>, dimensions: Dimensions) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidIdentifier(
                "box template name must not be empty".to_string(),
            ));
        }
        Ok(Self { name, dimensions })
    }

    /// Returns the capacity of the template.
    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }
}

impl Dimensional for BoxTemplate {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

#[derive(Deserialize)]
struct RawBoxTemplate {
    name: String,
    height: f64,
    width: f64,
    length: f64,
}

impl TryFrom<RawBoxTemplate> for BoxTemplate {
    type Error = ValidationError;

    fn try_from(raw: RawBoxTemplate) -> Result<Self, Self::Error> {
        let dims = Dimensions::new(raw.height, raw.width, raw.length)?;
        Self::new(raw.name, dims)
    }
}

/// An order: id plus its products as submitted.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: Identifier,
    pub products: Vec<Product>,
}

impl Order {
    pub fn new(id: impl Into<Identifier>, products: Vec<Product>) -> Self {
        Self {
            id: id.into(),
            products,
        }
    }
}
