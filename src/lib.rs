//! Box optimization for order fulfilment.
//!
//! Every order is packed independently: its products are sorted by
//! decreasing volume and assigned, best-fit, to boxes from a fixed catalog.
//! Products that fit no box are reported with a diagnostic note instead of
//! being dropped.

pub mod api;
pub mod catalog;
pub mod config;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod orchestrator;
pub mod result;
pub mod types;

pub use catalog::BoxCatalog;
pub use model::{BoxTemplate, Identifier, Order, Product, ValidationError};
pub use optimizer::{PackEvent, pack, pack_with_progress};
pub use orchestrator::{Optimizer, optimize, optimize_parallel};
pub use result::{PackedBox, PackingResult, UnplacedReason};
pub use types::{Dimensional, Dimensions};
