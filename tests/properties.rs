//! Property tests for the aggregation pipeline.

mod common;

use common::sales;
use opsdash::data::RawRecord;
use opsdash::dashboards::{Lifecycle, LifecycleFilters};
use opsdash::filter::{FilterChain, FilterField, FilterSpec, Selection};
use opsdash::pipeline::{Dashboard, Dataset};
use opsdash::stats::{group_by, Measure};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Sale {
    region: String,
    product: String,
    amount: f64,
}

fn sale() -> impl Strategy<Value = Sale> {
    (
        prop::sample::select(vec!["North", "South", "East"]),
        prop::sample::select(vec!["P1", "P2", "P3", "P4"]),
        0.0f64..1_000.0,
    )
        .prop_map(|(region, product, amount)| Sale {
            region: region.to_string(),
            product: product.to_string(),
            amount,
        })
}

fn raw_sale() -> impl Strategy<Value = RawRecord> {
    (
        prop::sample::select(vec!["X", "Y", "Z"]),
        prop::sample::select(vec!["P1", "P2"]),
        prop::sample::select(vec!["100", "25.5", "", "n/a", "1,000"]),
        prop::sample::select(vec!["2022", "2023", "2024"]),
    )
        .prop_map(|(c, p, s, y)| sales(c, p, s, y))
}

fn pick() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(vec!["North", "South", "East", "West", "P1", "P3"]))
        .prop_map(|v| v.map(str::to_string))
}

fn chain() -> FilterChain<Sale> {
    FilterChain::new(vec![
        FilterField::text("region", |s: &Sale| Some(s.region.clone())),
        FilterField::text("product", |s: &Sale| Some(s.product.clone())).sorted(),
    ])
}

proptest! {
    #[test]
    fn recompute_is_pure(
        rows in prop::collection::vec(raw_sale(), 0..40),
        year in prop::option::of(prop::sample::select(vec!["2022", "2023", "2025"])),
    ) {
        let data = Dataset::from_raw(&rows);
        let filters = LifecycleFilters {
            year: year.map(str::to_string),
            ..Default::default()
        };
        let first = Lifecycle::compute(data.rows(), &filters);
        let second = Lifecycle::compute(data.rows(), &filters);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn stages_never_grow(
        rows in prop::collection::vec(sale(), 0..50),
        region in pick(),
        product in pick(),
    ) {
        let spec = FilterSpec::new()
            .with("region", Selection::single(region.as_deref()))
            .with("product", Selection::single(product.as_deref()));
        let out = chain().apply(&rows, &spec);

        let mut previous = rows.len();
        for count in &out.stage_counts {
            prop_assert!(*count <= previous);
            previous = *count;
        }
        prop_assert_eq!(previous, out.rows.len());
    }

    #[test]
    fn shares_sum_to_one_hundred(
        rows in prop::collection::vec(sale(), 0..50),
        region in pick(),
    ) {
        let spec = FilterSpec::new().with("region", Selection::single(region.as_deref()));
        let view = chain().apply(&rows, &spec);
        let grouped = group_by(
            view.iter(),
            |s| Some(s.product.clone()),
            &[Measure::sum("amount", |s: &Sale| Some(s.amount))],
        );

        let shares: Vec<f64> = grouped.groups.iter().map(|g| grouped.share(g, "amount")).collect();
        prop_assert!(shares.iter().all(|p| p.is_finite()));
        let sum: f64 = shares.iter().sum();
        if grouped.grand_total("amount") > 0.0 {
            prop_assert!((sum - 100.0).abs() < 1e-6);
        } else {
            prop_assert_eq!(sum, 0.0);
        }
    }
}
