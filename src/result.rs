//! Result model of a packing pass.
//!
//! A filled box is either assigned to a catalog template or it is the
//! single-product placeholder for something no template can hold. Both cases
//! are variants of `PackedBox`, so callers have to handle the unassignable
//! case explicitly.

use std::fmt;

use crate::model::{BoxTemplate, Product};
use crate::types::Dimensional;

/// Reasons why a product could not be assigned to any box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnplacedReason {
    /// The product does not fit any template under any rotation.
    NoTemplateFits,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::NoTemplateFits => "no_template_fits",
        }
    }
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnplacedReason::NoTemplateFits => {
                write!(f, "Produto não cabe em nenhuma caixa disponível.")
            }
        }
    }
}

/// Outcome for one box of an order.
#[derive(Clone, Debug, PartialEq)]
pub enum PackedBox {
    /// A catalog box holding one or more products in placement order.
    Assigned {
        template: BoxTemplate,
        items: Vec<Product>,
    },
    /// Placeholder for a product that fits no template.
    Unassignable {
        item: Product,
        reason: UnplacedReason,
    },
}

impl PackedBox {
    /// Name of the assigned template, `None` for unassignable products.
    pub fn box_id(&self) -> Option<&str> {
        match self {
            PackedBox::Assigned { template, .. } => Some(template.name.as_str()),
            PackedBox::Unassignable { .. } => None,
        }
    }

    pub fn template(&self) -> Option<&BoxTemplate> {
        match self {
            PackedBox::Assigned { template, .. } => Some(template),
            PackedBox::Unassignable { .. } => None,
        }
    }

    /// Products in the order they were placed into this box.
    pub fn products(&self) -> &[Product] {
        match self {
            PackedBox::Assigned { items, .. } => items,
            PackedBox::Unassignable { item, .. } => std::slice::from_ref(item),
        }
    }

    pub fn product_ids(&self) -> Vec<String> {
        self.products().iter().map(|p| p.id.to_string()).collect()
    }

    /// Diagnostic text, present exactly for unassignable products.
    pub fn note(&self) -> Option<String> {
        match self {
            PackedBox::Assigned { .. } => None,
            PackedBox::Unassignable { reason, .. } => Some(reason.to_string()),
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, PackedBox::Assigned { .. })
    }

    /// Sum of the volumes of all products in the box.
    pub fn used_volume(&self) -> f64 {
        self.products().iter().map(|p| p.volume()).sum()
    }

    /// Remaining capacity of an assigned box.
    pub fn remaining_volume(&self) -> Option<f64> {
        self.template().map(|t| t.volume() - self.used_volume())
    }

    /// Volume usage in percent (0.0 to 100.0) of an assigned box.
    pub fn utilization_percent(&self) -> Option<f64> {
        self.template()
            .map(|t| (self.used_volume() / t.volume()) * 100.0)
    }
}

/// Packing outcome of one order.
#[derive(Clone, Debug, PartialEq)]
pub struct PackingResult {
    pub order_id: String,
    pub boxes: Vec<PackedBox>,
}

impl PackingResult {
    /// Number of boxes, including unassignable placeholders.
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn unassignable_count(&self) -> usize {
        self.boxes.iter().filter(|b| !b.is_assigned()).count()
    }

    /// True if every product ended up in a real box.
    pub fn is_complete(&self) -> bool {
        self.unassignable_count() == 0
    }

    pub fn product_count(&self) -> usize {
        self.boxes.iter().map(|b| b.products().len()).sum()
    }

    /// Average volume usage of the assigned boxes.
    pub fn average_utilization(&self) -> f64 {
        let usages: Vec<f64> = self
            .boxes
            .iter()
            .filter_map(PackedBox::utilization_percent)
            .collect();
        if usages.is_empty() {
            return 0.0;
        }
        usages.iter().sum::<f64>() / usages.len() as f64
    }
}
