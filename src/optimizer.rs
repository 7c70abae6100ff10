//! Packing engine: best-fit decreasing over a fixed box catalog.
//!
//! Products of one order are sorted by decreasing volume and placed one by
//! one. For each product the engine compares two candidates:
//! - the already opened box that would be left with the least free volume,
//! - the catalog template that wastes the least volume when opened for it.
//!
//! Reuse wins ties, so an equally wasteful open box is preferred over a new
//! one. Products that fit no template get their own unassignable box.
//!
//! Feasibility is approximated by a sorted-edge fit test plus a volume sum;
//! see [`crate::geometry`].

use serde::Serialize;

use crate::catalog::BoxCatalog;
use crate::geometry::waste_after;
use crate::model::{BoxTemplate, Product};
use crate::result::{PackedBox, UnplacedReason};
use crate::types::Dimensional;

/// A box opened during the pass over one order.
///
/// Lives only for the duration of a single `pack` call. Unassignable
/// placeholders hold exactly one product and never take another.
#[derive(Clone, Debug)]
pub enum OpenBox<'c> {
    Catalog {
        template: &'c BoxTemplate,
        used_volume: f64,
        items: Vec<Product>,
    },
    Unassignable(Product),
}

impl<'c> OpenBox<'c> {
    /// Opens a catalog box seeded with its first product.
    pub fn with_template(template: &'c BoxTemplate, first: Product) -> Self {
        OpenBox::Catalog {
            template,
            used_volume: first.volume(),
            items: vec![first],
        }
    }

    /// Volume left unused if `product` were added, `None` if it cannot go in.
    pub fn waste_if_added(&self, product: &Product) -> Option<f64> {
        match self {
            OpenBox::Catalog {
                template,
                used_volume,
                ..
            } if product.fits_in(*template) => {
                waste_after(template.volume(), *used_volume, product.volume())
            }
            _ => None,
        }
    }

    /// Adds a product to a catalog box and returns the new used volume.
    ///
    /// Unassignable placeholders hand the product back.
    fn push(&mut self, product: Product) -> Result<f64, Product> {
        match self {
            OpenBox::Catalog {
                used_volume, items, ..
            } => {
                *used_volume += product.volume();
                items.push(product);
                Ok(*used_volume)
            }
            OpenBox::Unassignable(_) => Err(product),
        }
    }

    fn into_packed(self) -> PackedBox {
        match self {
            OpenBox::Catalog {
                template, items, ..
            } => PackedBox::Assigned {
                template: template.clone(),
                items,
            },
            OpenBox::Unassignable(item) => PackedBox::Unassignable {
                item,
                reason: UnplacedReason::NoTemplateFits,
            },
        }
    }
}

/// A feasible placement target with the volume it would leave unused.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub waste: f64,
}

/// Decision for a single product.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Append to the open box at `index`.
    Reuse { index: usize, waste: f64 },
    /// Open a new box from the catalog template at `template_index`.
    Open { template_index: usize, waste: f64 },
    /// No template fits the product.
    Unassignable,
}

/// Finds the open box that is left tightest after adding `product`.
///
/// Only catalog boxes qualify; the product must fit the box dimensions and
/// the volume sum must stay within capacity. Among equal leftovers the
/// earliest opened box wins.
pub fn best_reusable_box(product: &Product, boxes: &[OpenBox<'_>]) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;

    for (index, open) in boxes.iter().enumerate() {
        let Some(waste) = open.waste_if_added(product) else {
            continue;
        };
        if best.is_none_or(|current| waste < current.waste) {
            best = Some(Candidate { index, waste });
        }
    }

    best
}

/// Finds the smallest catalog template that fits `product`.
///
/// Among templates with equal waste the first in catalog order wins.
pub fn best_new_template(product: &Product, catalog: &BoxCatalog) -> Option<Candidate> {
    let volume = product.volume();
    let mut best: Option<Candidate> = None;

    for (index, template) in catalog.iter().enumerate() {
        if !product.fits_in(template) {
            continue;
        }
        let waste = template.volume() - volume;
        if best.is_none_or(|current| waste < current.waste) {
            best = Some(Candidate { index, waste });
        }
    }

    best
}

/// Chooses between reusing an open box and opening a new one.
///
/// A missing candidate counts as infinite waste. Reuse wins when its waste is
/// less than or equal to the waste of the new box.
pub fn decide(reuse: Option<Candidate>, new_box: Option<Candidate>) -> Placement {
    let waste_reuse = reuse.map_or(f64::INFINITY, |c| c.waste);
    let waste_new = new_box.map_or(f64::INFINITY, |c| c.waste);

    match (reuse, new_box) {
        (Some(candidate), _) if waste_reuse <= waste_new => Placement::Reuse {
            index: candidate.index,
            waste: candidate.waste,
        },
        (_, Some(candidate)) => Placement::Open {
            template_index: candidate.index,
            waste: candidate.waste,
        },
        _ => Placement::Unassignable,
    }
}

/// Sorts products by decreasing volume.
///
/// The sort is stable: products of equal volume keep their submitted order.
pub fn sort_by_volume_desc(products: &mut [Product]) {
    products.sort_by(|a, b| b.volume().total_cmp(&a.volume()));
}

/// Events emitted while packing, one per decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new catalog box was opened.
    BoxOpened {
        box_number: usize,
        template: String,
        capacity: f64,
    },
    /// A product was placed into a catalog box.
    ProductPlaced {
        box_number: usize,
        product_id: String,
        volume: f64,
        used_volume: f64,
        waste: f64,
        reused: bool,
    },
    /// A product fits no template and got its own unassignable box.
    ProductRejected {
        box_number: usize,
        product_id: String,
        volume: f64,
        reason_code: String,
        reason_text: String,
    },
    /// Packing of the order finished.
    Finished { boxes: usize, unassignable: usize },
}

/// Packs the products of one order into boxes from `catalog`.
///
/// Returns one `PackedBox` per opened box, in opening order. Every product
/// ends up in exactly one box.
///
/// # Examples
/// ```
/// use packaging_optimizer::catalog::BoxCatalog;
/// use packaging_optimizer::model::Product;
/// use packaging_optimizer::optimizer::pack;
///
/// let products = vec![Product::with_dims("PROD001", 5.0, 10.0, 3.0).unwrap()];
/// let boxes = pack(products, &BoxCatalog::default());
/// assert_eq!(boxes.len(), 1);
/// assert_eq!(boxes[0].box_id(), Some("Caixa 1"));
/// ```
pub fn pack(products: Vec<Product>, catalog: &BoxCatalog) -> Vec<PackedBox> {
    pack_with_progress(products, catalog, |_| {})
}

/// Like [`pack`], reporting each decision through `on_event`.
pub fn pack_with_progress(
    products: Vec<Product>,
    catalog: &BoxCatalog,
    mut on_event: impl FnMut(&PackEvent),
) -> Vec<PackedBox> {
    let mut products = products;
    sort_by_volume_desc(&mut products);

    let mut boxes: Vec<OpenBox<'_>> = Vec::new();
    let mut unassignable = 0;

    for mut product in products {
        let reuse = best_reusable_box(&product, &boxes);
        let new_box = best_new_template(&product, catalog);

        let placement = match decide(reuse, new_box) {
            Placement::Reuse { index, waste } => {
                let volume = product.volume();
                let product_id = product.id.to_string();
                match boxes[index].push(product) {
                    Ok(used_volume) => {
                        on_event(&PackEvent::ProductPlaced {
                            box_number: index + 1,
                            product_id,
                            volume,
                            used_volume,
                            waste,
                            reused: true,
                        });
                        continue;
                    }
                    Err(refused) => {
                        product = refused;
                        decide(None, new_box)
                    }
                }
            }
            other => other,
        };

        match placement {
            Placement::Open {
                template_index,
                waste,
            } => {
                let template = &catalog.templates()[template_index];
                let box_number = boxes.len() + 1;
                let volume = product.volume();
                let product_id = product.id.to_string();
                on_event(&PackEvent::BoxOpened {
                    box_number,
                    template: template.name.clone(),
                    capacity: template.volume(),
                });
                boxes.push(OpenBox::with_template(template, product));
                on_event(&PackEvent::ProductPlaced {
                    box_number,
                    product_id,
                    volume,
                    used_volume: volume,
                    waste,
                    reused: false,
                });
            }
            Placement::Reuse { .. } | Placement::Unassignable => {
                let reason = UnplacedReason::NoTemplateFits;
                on_event(&PackEvent::ProductRejected {
                    box_number: boxes.len() + 1,
                    product_id: product.id.to_string(),
                    volume: product.volume(),
                    reason_code: reason.code().to_string(),
                    reason_text: reason.to_string(),
                });
                unassignable += 1;
                boxes.push(OpenBox::Unassignable(product));
            }
        }
    }

    on_event(&PackEvent::Finished {
        boxes: boxes.len(),
        unassignable,
    });

    boxes.into_iter().map(OpenBox::into_packed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fits;
    use crate::types::Dimensions;
    use proptest::prelude::*;

    fn product(id: &str, h: f64, w: f64, l: f64) -> Product {
        Product::with_dims(id, h, w, l).unwrap()
    }

    fn catalog(templates: &[(&str, f64, f64, f64)]) -> BoxCatalog {
        BoxCatalog::new(
            templates
                .iter()
                .map(|&(name, h, w, l)| {
                    BoxTemplate::new(name, Dimensions::new(h, w, l).unwrap()).unwrap()
                })
                .collect(),
        )
        .unwrap()
    }

    fn ids(packed: &PackedBox) -> Vec<String> {
        packed.product_ids()
    }

    #[test]
    fn single_product_goes_into_smallest_fitting_box() {
        let boxes = pack(vec![product("PROD001", 5.0, 10.0, 3.0)], &BoxCatalog::default());
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].box_id(), Some("Caixa 1"));
        assert_eq!(ids(&boxes[0]), ["PROD001"]);
        assert_eq!(boxes[0].note(), None);
    }

    #[test]
    fn oversized_product_is_reported_unassignable() {
        let boxes = pack(
            vec![product("PROD003", 100.0, 200.0, 300.0)],
            &BoxCatalog::default(),
        );
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].box_id(), None);
        assert_eq!(ids(&boxes[0]), ["PROD003"]);
        assert_eq!(
            boxes[0].note().as_deref(),
            Some("Produto não cabe em nenhuma caixa disponível.")
        );
    }

    #[test]
    fn two_products_share_one_box_larger_first() {
        let boxes = pack(
            vec![
                product("PROD001", 5.0, 10.0, 3.0),
                product("PROD002", 15.0, 20.0, 10.0),
            ],
            &BoxCatalog::default(),
        );
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].box_id(), Some("Caixa 1"));
        assert_eq!(ids(&boxes[0]), ["PROD002", "PROD001"]);
    }

    #[test]
    fn products_that_cannot_share_get_tightest_templates() {
        let boxes = pack(
            vec![
                product("SMALL", 30.0, 40.0, 80.0),
                product("LARGE", 50.0, 80.0, 60.0),
                product("MEDIUM", 50.0, 50.0, 40.0),
            ],
            &BoxCatalog::default(),
        );
        let names: Vec<_> = boxes.iter().map(|b| b.box_id()).collect();
        assert_eq!(names, [Some("Caixa 3"), Some("Caixa 2"), Some("Caixa 1")]);
        assert_eq!(ids(&boxes[0]), ["LARGE"]);
        assert_eq!(ids(&boxes[1]), ["MEDIUM"]);
        assert_eq!(ids(&boxes[2]), ["SMALL"]);
    }

    #[test]
    fn equal_volumes_keep_submitted_order() {
        let boxes = pack(
            vec![
                product("SMALL1", 2.0, 3.0, 2.0),
                product("SMALL2", 2.0, 3.0, 2.0),
            ],
            &BoxCatalog::default(),
        );
        assert_eq!(boxes.len(), 1);
        assert_eq!(ids(&boxes[0]), ["SMALL1", "SMALL2"]);
    }

    #[test]
    fn largest_product_is_placed_first() {
        let boxes = pack(
            vec![
                product("TINY", 1.0, 1.0, 1.0),
                product("LARGE", 10.0, 15.0, 8.0),
                product("MEDIUM", 5.0, 8.0, 6.0),
            ],
            &BoxCatalog::default(),
        );
        assert_eq!(ids(&boxes[0]), ["LARGE", "MEDIUM", "TINY"]);
    }

    #[test]
    fn perfect_fit_selects_exact_template() {
        let boxes = pack(
            vec![product("PERFECT", 50.0, 50.0, 40.0)],
            &BoxCatalog::default(),
        );
        assert_eq!(boxes[0].box_id(), Some("Caixa 2"));
        assert_eq!(boxes[0].remaining_volume(), Some(0.0));
    }

    #[test]
    fn small_addon_reuses_open_box() {
        let boxes = pack(
            vec![
                product("BASE", 20.0, 30.0, 35.0),
                product("ADDON", 5.0, 5.0, 5.0),
            ],
            &BoxCatalog::default(),
        );
        assert_eq!(boxes.len(), 1);
        assert_eq!(ids(&boxes[0]), ["BASE", "ADDON"]);
    }

    #[test]
    fn empty_order_yields_no_boxes() {
        assert!(pack(Vec::new(), &BoxCatalog::default()).is_empty());
    }

    #[test]
    fn equal_waste_prefers_reuse() {
        let catalog = catalog(&[("Big", 10.0, 10.0, 10.0), ("Slim", 4.0, 10.0, 10.0)]);
        // Reuse leaves 1000 - 600 - 200 = 200, a new Slim box wastes 400 - 200 = 200.
        let boxes = pack(
            vec![product("P1", 6.0, 10.0, 10.0), product("P2", 2.0, 10.0, 10.0)],
            &catalog,
        );
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].box_id(), Some("Big"));
        assert_eq!(ids(&boxes[0]), ["P1", "P2"]);
    }

    #[test]
    fn tighter_new_box_beats_wasteful_reuse() {
        let catalog = catalog(&[("Big", 10.0, 10.0, 10.0), ("Tray", 2.0, 10.0, 10.0)]);
        let boxes = pack(
            vec![product("P1", 6.0, 10.0, 10.0), product("P2", 2.0, 10.0, 10.0)],
            &catalog,
        );
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].box_id(), Some("Big"));
        assert_eq!(boxes[1].box_id(), Some("Tray"));
        assert_eq!(ids(&boxes[1]), ["P2"]);
    }

    #[test]
    fn reuse_picks_tightest_open_box() {
        let catalog = catalog(&[("Cube", 10.0, 10.0, 10.0)]);
        let boxes = pack(
            vec![
                product("P1", 7.0, 10.0, 10.0),
                product("P2", 6.0, 10.0, 10.0),
                product("P3", 1.0, 10.0, 10.0),
            ],
            &catalog,
        );
        assert_eq!(boxes.len(), 2);
        assert_eq!(ids(&boxes[0]), ["P1", "P3"]);
        assert_eq!(ids(&boxes[1]), ["P2"]);
    }

    #[test]
    fn reuse_requires_dimension_fit_not_only_volume() {
        let catalog = catalog(&[("Flat", 2.0, 50.0, 50.0), ("Tall", 20.0, 20.0, 20.0)]);
        // The rod fits the free volume of "Flat" but not its shape.
        let boxes = pack(
            vec![product("PLATE", 1.0, 50.0, 50.0), product("ROD", 10.0, 10.0, 10.0)],
            &catalog,
        );
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].box_id(), Some("Flat"));
        assert_eq!(boxes[1].box_id(), Some("Tall"));
    }

    #[test]
    fn equal_template_waste_uses_catalog_order() {
        let catalog = catalog(&[("A", 10.0, 10.0, 20.0), ("B", 20.0, 10.0, 10.0)]);
        let boxes = pack(vec![product("P", 5.0, 5.0, 5.0)], &catalog);
        assert_eq!(boxes[0].box_id(), Some("A"));
    }

    #[test]
    fn unassignable_box_is_never_reused() {
        let boxes = pack(
            vec![
                product("SMALL", 1.0, 1.0, 1.0),
                product("HUGE", 100.0, 200.0, 300.0),
            ],
            &BoxCatalog::default(),
        );
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].box_id(), None);
        assert_eq!(ids(&boxes[0]), ["HUGE"]);
        assert_eq!(boxes[1].box_id(), Some("Caixa 1"));
        assert_eq!(ids(&boxes[1]), ["SMALL"]);
    }

    #[test]
    fn decide_handles_all_branches() {
        let reuse = Some(Candidate { index: 0, waste: 5.0 });
        let cheap_new = Some(Candidate { index: 1, waste: 3.0 });
        let equal_new = Some(Candidate { index: 1, waste: 5.0 });

        assert_eq!(
            decide(reuse, equal_new),
            Placement::Reuse { index: 0, waste: 5.0 }
        );
        assert_eq!(
            decide(reuse, cheap_new),
            Placement::Open {
                template_index: 1,
                waste: 3.0
            }
        );
        assert_eq!(decide(reuse, None), Placement::Reuse { index: 0, waste: 5.0 });
        assert_eq!(
            decide(None, cheap_new),
            Placement::Open {
                template_index: 1,
                waste: 3.0
            }
        );
        assert_eq!(decide(None, None), Placement::Unassignable);
    }

    #[test]
    fn best_new_template_none_when_nothing_fits() {
        let huge = product("HUGE", 60.0, 90.0, 100.0);
        assert_eq!(best_new_template(&huge, &BoxCatalog::default()), None);
    }

    #[test]
    fn best_reusable_box_skips_unassignable_and_full_boxes() {
        let catalog = catalog(&[("Cube", 10.0, 10.0, 10.0)]);
        let template = &catalog.templates()[0];
        let boxes = vec![
            OpenBox::Unassignable(product("HUGE", 100.0, 100.0, 100.0)),
            OpenBox::with_template(template, product("FULL", 10.0, 10.0, 10.0)),
            OpenBox::with_template(template, product("HALF", 5.0, 10.0, 10.0)),
        ];
        let candidate = best_reusable_box(&product("P", 1.0, 10.0, 10.0), &boxes);
        assert_eq!(candidate, Some(Candidate { index: 2, waste: 400.0 }));
        assert_eq!(boxes[1].waste_if_added(&product("P", 1.0, 10.0, 10.0)), None);
        assert_eq!(boxes[0].waste_if_added(&product("P", 1.0, 1.0, 1.0)), None);
    }

    #[test]
    fn unassignable_box_refuses_further_products() {
        let mut placeholder = OpenBox::Unassignable(product("HUGE", 100.0, 100.0, 100.0));
        let refused = placeholder.push(product("TINY", 1.0, 1.0, 1.0)).unwrap_err();
        assert_eq!(refused.id.as_str(), "TINY");
        assert!(matches!(
            placeholder.into_packed(),
            PackedBox::Unassignable { item, .. } if item.id.as_str() == "HUGE"
        ));
    }

    #[test]
    fn progress_reports_every_decision() {
        let mut events = Vec::new();
        let boxes = pack_with_progress(
            vec![
                product("PROD001", 5.0, 10.0, 3.0),
                product("PROD002", 15.0, 20.0, 10.0),
                product("HUGE", 100.0, 200.0, 300.0),
            ],
            &BoxCatalog::default(),
            |event| events.push(event.clone()),
        );

        assert_eq!(boxes.len(), 2);
        assert!(matches!(
            &events[0],
            PackEvent::ProductRejected { box_number: 1, product_id, .. } if product_id == "HUGE"
        ));
        assert!(matches!(
            &events[1],
            PackEvent::BoxOpened { box_number: 2, template, .. } if template == "Caixa 1"
        ));
        assert!(matches!(
            &events[2],
            PackEvent::ProductPlaced { box_number: 2, reused: false, .. }
        ));
        assert!(matches!(
            &events[3],
            PackEvent::ProductPlaced { box_number: 2, reused: true, .. }
        ));
        assert_eq!(
            events.last(),
            Some(&PackEvent::Finished {
                boxes: 2,
                unassignable: 1
            })
        );
    }

    #[test]
    fn pack_event_serializes_with_type_tag() {
        let json = serde_json::to_value(PackEvent::Finished {
            boxes: 1,
            unassignable: 0,
        })
        .unwrap();
        assert_eq!(json["type"], "Finished");
        assert_eq!(json["boxes"], 1);
    }

    fn product_strategy() -> impl Strategy<Value = Vec<(u32, u32, u32)>> {
        prop::collection::vec((1u32..=110, 1u32..=110, 1u32..=110), 0..24)
    }

    fn to_products(raw: &[(u32, u32, u32)]) -> Vec<Product> {
        raw.iter()
            .enumerate()
            .map(|(i, &(h, w, l))| product(&format!("P{}", i), h as f64, w as f64, l as f64))
            .collect()
    }

    proptest! {
        #[test]
        fn every_product_is_placed_exactly_once(raw in product_strategy()) {
            let products = to_products(&raw);
            let boxes = pack(products.clone(), &BoxCatalog::default());

            let mut placed: Vec<String> = boxes.iter().flat_map(|b| b.product_ids()).collect();
            let mut expected: Vec<String> = products.iter().map(|p| p.id.to_string()).collect();
            placed.sort();
            expected.sort();
            prop_assert_eq!(placed, expected);
        }

        #[test]
        fn assigned_boxes_respect_capacity_and_fit(raw in product_strategy()) {
            let boxes = pack(to_products(&raw), &BoxCatalog::default());

            for packed in &boxes {
                match packed {
                    PackedBox::Assigned { template, items } => {
                        let used: f64 = items.iter().map(|p| p.volume()).sum();
                        prop_assert!(used <= template.volume());
                        for item in items {
                            prop_assert!(fits(&item.dimensions, &template.dimensions));
                        }
                    }
                    PackedBox::Unassignable { item, .. } => {
                        for template in BoxCatalog::default().iter() {
                            prop_assert!(!fits(&item.dimensions, &template.dimensions));
                        }
                    }
                }
            }
        }

        #[test]
        fn packing_is_deterministic(raw in product_strategy()) {
            let first = pack(to_products(&raw), &BoxCatalog::default());
            let second = pack(to_products(&raw), &BoxCatalog::default());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn products_within_a_box_are_in_decreasing_volume(raw in product_strategy()) {
            let boxes = pack(to_products(&raw), &BoxCatalog::default());
            for packed in &boxes {
                let volumes: Vec<f64> = packed.products().iter().map(|p| p.volume()).collect();
                prop_assert!(volumes.windows(2).all(|w| w[0] >= w[1]));
            }
        }
    }
}
