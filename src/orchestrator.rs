//! Runs the packing engine over a batch of orders.
//!
//! Orders never share boxes or state. The parallel variant therefore needs no
//! coordination beyond collecting results back in input order.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::catalog::BoxCatalog;
use crate::model::Order;
use crate::optimizer::{PackEvent, pack_with_progress};
use crate::result::PackingResult;

/// Packs a single order.
pub fn optimize_order(order: Order, catalog: &BoxCatalog) -> PackingResult {
    let Order { id, products } = order;
    let order_id = id.to_string();

    let boxes = pack_with_progress(products, catalog, |event| {
        if let PackEvent::ProductRejected {
            product_id,
            volume,
            reason_code,
            ..
        } = event
        {
            warn!(
                order_id = %order_id,
                product_id = %product_id,
                volume,
                largest_box_volume = catalog.largest_volume(),
                reason = %reason_code,
                "product fits no box in the catalog"
            );
        }
    });

    let result = PackingResult { order_id, boxes };
    debug!(
        order_id = %result.order_id,
        products = result.product_count(),
        boxes = result.box_count(),
        unassignable = result.unassignable_count(),
        utilization = result.average_utilization(),
        "order packed"
    );
    result
}

/// Packs every order sequentially. Output order matches input order.
pub fn optimize(orders: Vec<Order>, catalog: &BoxCatalog) -> Vec<PackingResult> {
    orders
        .into_iter()
        .map(|order| optimize_order(order, catalog))
        .collect()
}

/// Packs orders on the rayon thread pool.
///
/// Produces exactly the same output as [`optimize`].
pub fn optimize_parallel(orders: Vec<Order>, catalog: &BoxCatalog) -> Vec<PackingResult> {
    orders
        .into_par_iter()
        .map(|order| optimize_order(order, catalog))
        .collect()
}

/// Catalog plus execution strategy, shared by all requests.
#[derive(Clone, Debug)]
pub struct Optimizer {
    catalog: BoxCatalog,
    parallel_threshold: usize,
}

impl Optimizer {
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

    /// `parallel_threshold` is the minimum batch size for parallel packing;
    /// `0` disables it.
    pub fn new(catalog: BoxCatalog, parallel_threshold: usize) -> Self {
        Self {
            catalog,
            parallel_threshold,
        }
    }

    pub fn catalog(&self) -> &BoxCatalog {
        &self.catalog
    }

    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    fn runs_parallel(&self, order_count: usize) -> bool {
        self.parallel_threshold > 0 && order_count >= self.parallel_threshold
    }

    /// Packs a batch, in parallel when it is large enough.
    pub fn optimize(&self, orders: Vec<Order>) -> Vec<PackingResult> {
        if self.runs_parallel(orders.len()) {
            debug!(orders = orders.len(), "packing batch in parallel");
            optimize_parallel(orders, &self.catalog)
        } else {
            optimize(orders, &self.catalog)
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(BoxCatalog::default(), Self::DEFAULT_PARALLEL_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;

    fn product(id: &str, h: f64, w: f64, l: f64) -> Product {
        Product::with_dims(id, h, w, l).unwrap()
    }

    fn sample_orders() -> Vec<Order> {
        vec![
            Order::new(5i64, vec![product("PROD001", 5.0, 10.0, 3.0)]),
            Order::new("B-6", vec![product("PROD002", 15.0, 20.0, 10.0)]),
            Order::new(
                7i64,
                vec![
                    product("HUGE", 100.0, 200.0, 300.0),
                    product("TINY", 1.0, 1.0, 1.0),
                ],
            ),
            Order::new(8i64, Vec::new()),
        ]
    }

    #[test]
    fn results_follow_input_order() {
        let results = optimize(sample_orders(), &BoxCatalog::default());
        let ids: Vec<_> = results.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, ["5", "B-6", "7", "8"]);
    }

    #[test]
    fn every_product_is_reported_once() {
        let results = optimize(sample_orders(), &BoxCatalog::default());
        let counts: Vec<_> = results.iter().map(PackingResult::product_count).collect();
        assert_eq!(counts, [1, 1, 2, 0]);
        assert_eq!(results[0].average_utilization(), 150.0 / 96_000.0 * 100.0);
    }

    #[test]
    fn empty_order_has_no_boxes() {
        let results = optimize(sample_orders(), &BoxCatalog::default());
        assert!(results[3].boxes.is_empty());
        assert!(results[3].is_complete());
    }

    #[test]
    fn orders_are_packed_independently() {
        let catalog = BoxCatalog::default();
        let alone = optimize(
            vec![Order::new(1i64, vec![product("A", 5.0, 10.0, 3.0)])],
            &catalog,
        );
        let together = optimize(
            vec![
                Order::new(1i64, vec![product("A", 5.0, 10.0, 3.0)]),
                Order::new(2i64, vec![product("A", 5.0, 10.0, 3.0)]),
            ],
            &catalog,
        );
        assert_eq!(alone[0], together[0]);
        assert_eq!(together[1].box_count(), 1);
    }

    #[test]
    fn parallel_matches_sequential() {
        let catalog = BoxCatalog::default();
        let orders: Vec<Order> = (0..40)
            .map(|i| {
                Order::new(
                    i as i64,
                    (0..(i % 7))
                        .map(|j| {
                            product(
                                &format!("P{}-{}", i, j),
                                (j + 1) as f64 * 4.0,
                                (i % 5 + 1) as f64 * 6.0,
                                15.0,
                            )
                        })
                        .collect(),
                )
            })
            .collect();

        let sequential = optimize(orders.clone(), &catalog);
        let parallel = optimize_parallel(orders, &catalog);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn optimizer_switches_strategy_by_threshold() {
        let optimizer = Optimizer::new(BoxCatalog::default(), 3);
        assert!(!optimizer.runs_parallel(2));
        assert!(optimizer.runs_parallel(3));

        let disabled = Optimizer::new(BoxCatalog::default(), 0);
        assert!(!disabled.runs_parallel(10_000));

        let results = optimizer.optimize(sample_orders());
        assert_eq!(results.len(), 4);
        assert_eq!(results[2].unassignable_count(), 1);
        assert_eq!(results[2].boxes[1].box_id(), Some("Caixa 1"));
    }
}
