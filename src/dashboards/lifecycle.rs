//! Sales Lifecycle Dashboard
//! Customer and product sales across financial years, with drill-down into a year's months.

use crate::calendar::{fiscal_month_rank, month_from_name};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{
    FieldOptions, FilterChain, FilterField, FilterSpec, MultiSelect, Selection,
};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{group_by, percent_change, total, Measure};
use serde::{Deserialize, Serialize};

pub const ALL_CUSTOMERS: &str = "All Customers";
pub const ALL_YEARS: &str = "All Years";
const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleRow {
    pub customer: String,
    pub product: String,
    pub year: Option<String>,
    pub month: Option<String>,
    /// Position in the April→March year; `None` when the month is not a month name.
    pub fiscal_rank: Option<u32>,
    pub sales: f64,
}

impl TypedRow for LifecycleRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::text("customer", &["Customer"]).required(),
            FieldSpec::text("product", &["Product"]).required(),
            FieldSpec::text("year", &["Financial Year", "FinancialYear"]),
            FieldSpec::text("month", &["Month"]),
            FieldSpec::number("sales", &["Sales"], NumberPolicy::ZeroIfInvalid),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let month = record.text("month");
        Some(Self {
            customer: record.text("customer")?.to_string(),
            product: record.text("product")?.to_string(),
            year: record.text("year").map(str::to_string),
            month: month.map(str::to_string),
            fiscal_rank: month.and_then(month_from_name).map(fiscal_month_rank),
            sales: record.number("sales").unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleFilters {
    /// `["All Customers"]`, empty, or the picked customers.
    pub customers: Vec<String>,
    pub year: Option<String>,
    /// Product picked from the share chart.
    pub product: Option<String>,
    pub drill_down_year: Option<String>,
}

impl LifecycleFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("year", Selection::single_labelled(self.year.as_deref(), ALL_YEARS))
            .with(
                "customer",
                MultiSelect::from_values(ALL_CUSTOMERS, &self.customers).selection(),
            )
            .with("product", Selection::single(self.product.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSales {
    pub customer: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSales {
    pub month: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductShare {
    pub product: String,
    pub sales: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSales {
    pub year: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
    pub product: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearProductSales {
    pub year: String,
    pub products: Vec<ProductSales>,
}

/// Months with positive sales in a financial year ("buying frequency").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesActivity {
    pub year: String,
    pub active_months: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleReport {
    pub total_sales: f64,
    pub previous_year: Option<String>,
    pub previous_year_sales: f64,
    pub sales_growth: f64,
    pub sales_by_customer: Vec<CustomerSales>,
    pub monthly_sales: Vec<MonthSales>,
    pub product_share: Vec<ProductShare>,
    pub yearly_sales: Vec<YearSales>,
    pub year_product_sales: Vec<YearProductSales>,
    pub sales_activity: Vec<SalesActivity>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Lifecycle;

fn chain() -> FilterChain<LifecycleRow> {
    FilterChain::new(vec![
        FilterField::text("year", |r: &LifecycleRow| r.year.clone()).sorted(),
        FilterField::text("customer", |r: &LifecycleRow| Some(r.customer.clone())),
        FilterField::text("product", |r: &LifecycleRow| Some(r.product.clone())),
    ])
}

fn sales(r: &LifecycleRow) -> Option<f64> {
    Some(r.sales)
}

impl Dashboard for Lifecycle {
    const NAME: &'static str = "lifecycle";
    type Row = LifecycleRow;
    type Filters = LifecycleFilters;
    type Output = LifecycleReport;

    fn compute(rows: &[LifecycleRow], filters: &LifecycleFilters) -> LifecycleReport {
        let chain = chain();
        let spec = filters.spec();
        let view = chain.apply(rows, &spec);
        let total_sales = total(view.iter(), sales);

        // Previous year is the predecessor in the ascending list of all years
        let mut years: Vec<&String> = rows.iter().filter_map(|r| r.year.as_ref()).collect();
        years.sort();
        years.dedup();
        let previous_year = match view.resolved.get("year") {
            Selection::One(y) => years
                .iter()
                .position(|v| *v == y)
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| years.get(i))
                .map(|v| v.to_string()),
            _ => None,
        };
        // Matched directly so the picks survive even when they have no rows that year
        let customer = view.resolved.get("customer");
        let product = view.resolved.get("product");
        let previous_year_sales = previous_year.as_deref().map_or(0.0, |p| {
            total(
                rows.iter().filter(|r| {
                    r.year.as_deref() == Some(p)
                        && customer.matches_text(Some(r.customer.as_str()))
                        && product.matches_text(Some(r.product.as_str()))
                }),
                sales,
            )
        });

        let by_customer = group_by(
            view.iter(),
            |r| Some(r.customer.clone()),
            &[Measure::sum("sales", sales)],
        );
        let sales_by_customer = shape(&by_customer, SeriesOrder::Encounter, None, |g| {
            CustomerSales {
                customer: g.key.clone(),
                sales: g.get("sales"),
            }
        });

        let drill = filters.drill_down_year.as_deref();
        let by_month = group_by(
            view.iter()
                .filter(|r| drill.map_or(true, |d| r.year.as_deref() == Some(d))),
            |r| {
                r.month
                    .clone()
                    .map(|m| (r.fiscal_rank.unwrap_or(u32::MAX), m))
            },
            &[Measure::sum("sales", sales)],
        );
        let monthly_sales = shape(&by_month, SeriesOrder::KeyAsc, None, |g| MonthSales {
            month: g.key.1.clone(),
            sales: g.get("sales"),
        });

        let by_product = group_by(
            view.iter(),
            |r| Some(r.product.clone()),
            &[Measure::sum("sales", sales)],
        );
        let product_share = shape(&by_product, SeriesOrder::ValueDesc("sales"), None, |g| {
            ProductShare {
                product: g.key.clone(),
                sales: g.get("sales"),
                percentage: by_product.share(g, "sales"),
            }
        });

        // Year charts span every year for the picked customers and product
        let all_years_spec = spec.clone().with("year", Selection::All);
        let across_years = chain.apply(rows, &all_years_spec);
        let by_year = group_by(
            across_years.iter(),
            |r| r.year.clone(),
            &[
                Measure::sum("sales", sales),
                Measure::distinct("active_months", |r: &LifecycleRow| {
                    r.month.clone().filter(|_| r.sales > 0.0)
                }),
            ],
        );
        let yearly_sales = shape(&by_year, SeriesOrder::KeyAsc, None, |g| YearSales {
            year: g.key.clone(),
            sales: g.get("sales"),
        });
        let sales_activity: Vec<SalesActivity> =
            shape(&by_year, SeriesOrder::KeyAsc, None, |g| {
                let active = g.get("active_months");
                SalesActivity {
                    year: g.key.clone(),
                    active_months: active as usize,
                    percentage: active / MONTHS_PER_YEAR * 100.0,
                }
            })
            .into_iter()
            .filter(|a| a.active_months > 0)
            .collect();

        // The stacked chart ignores the product pick so every product stays visible
        let stack_spec = all_years_spec.with("product", Selection::All);
        let stack_view = chain.apply(rows, &stack_spec);
        let year_product_sales = year_product_stack(stack_view.iter());

        LifecycleReport {
            total_sales,
            sales_growth: percent_change(total_sales, previous_year_sales),
            previous_year,
            previous_year_sales,
            sales_by_customer,
            monthly_sales,
            product_share,
            yearly_sales,
            year_product_sales,
            sales_activity,
            options: view.options.clone(),
            applied: view.resolved.clone(),
        }
    }
}

fn year_product_stack<'a>(rows: impl Iterator<Item = &'a LifecycleRow>) -> Vec<YearProductSales> {
    let grouped = group_by(
        rows,
        |r| r.year.clone().map(|y| (y, r.product.clone())),
        &[Measure::sum("sales", sales)],
    );
    let mut stack: Vec<YearProductSales> = Vec::new();
    for g in &grouped.groups {
        let (year, product) = &g.key;
        let entry = ProductSales {
            product: product.clone(),
            sales: g.get("sales"),
        };
        match stack.iter_mut().find(|s| &s.year == year) {
            Some(s) => s.products.push(entry),
            None => stack.push(YearProductSales {
                year: year.clone(),
                products: vec![entry],
            }),
        }
    }
    stack.sort_by(|a, b| a.year.cmp(&b.year));
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(customer: &str, product: &str, year: &str, month: &str, sales: f64) -> LifecycleRow {
        LifecycleRow {
            customer: customer.into(),
            product: product.into(),
            year: Some(year.into()),
            month: Some(month.into()),
            fiscal_rank: month_from_name(month).map(fiscal_month_rank),
            sales,
        }
    }

    fn rows() -> Vec<LifecycleRow> {
        vec![
            row("X", "P1", "2022", "April", 40.0),
            row("X", "P1", "2023", "April", 100.0),
            row("Y", "P2", "2023", "January", 20.0),
            row("Y", "P1", "2023", "December", 30.0),
            row("Z", "P2", "2024", "May", 0.0),
        ]
    }

    fn filters(year: &str) -> LifecycleFilters {
        LifecycleFilters {
            customers: vec![ALL_CUSTOMERS.into()],
            year: Some(year.into()),
            ..Default::default()
        }
    }

    #[test]
    fn totals_and_growth_against_previous_year() {
        let report = Lifecycle::compute(&rows(), &filters("2023"));
        assert_eq!(report.total_sales, 150.0);
        assert_eq!(report.previous_year.as_deref(), Some("2022"));
        assert_eq!(report.previous_year_sales, 40.0);
        assert_eq!(report.sales_growth, 275.0);
    }

    #[test]
    fn first_year_has_no_growth() {
        let report = Lifecycle::compute(&rows(), &filters("2022"));
        assert_eq!(report.previous_year, None);
        assert_eq!(report.sales_growth, 0.0);

        let report = Lifecycle::compute(&rows(), &filters(ALL_YEARS));
        assert_eq!(report.total_sales, 190.0);
        assert_eq!(report.previous_year_sales, 0.0);
    }

    #[test]
    fn previous_year_keeps_the_customer_pick() {
        let rows = vec![
            row("X", "P1", "2022", "April", 1000.0),
            row("Y", "P1", "2023", "April", 50.0),
        ];
        let f = LifecycleFilters {
            customers: vec!["Y".into()],
            year: Some("2023".into()),
            ..Default::default()
        };
        let report = Lifecycle::compute(&rows, &f);
        assert_eq!(report.total_sales, 50.0);
        assert_eq!(report.previous_year.as_deref(), Some("2022"));
        // Y bought nothing in 2022, so X's sales must not leak in
        assert_eq!(report.previous_year_sales, 0.0);
        assert_eq!(report.sales_growth, 0.0);
    }

    #[test]
    fn previous_year_keeps_the_product_pick() {
        let mut rows = rows();
        rows.push(row("X", "P2", "2022", "May", 500.0));
        let f = LifecycleFilters {
            year: Some("2023".into()),
            product: Some("P1".into()),
            ..Default::default()
        };
        let report = Lifecycle::compute(&rows, &f);
        assert_eq!(report.total_sales, 130.0);
        assert_eq!(report.previous_year_sales, 40.0);
    }

    #[test]
    fn customer_named_like_a_sentinel_is_selectable() {
        let rows = vec![
            row("All Star Metals", "P1", "2023", "April", 100.0),
            row("Beta", "P1", "2023", "April", 50.0),
        ];
        let f = LifecycleFilters {
            customers: vec!["All Star Metals".into()],
            ..Default::default()
        };
        let report = Lifecycle::compute(&rows, &f);
        assert_eq!(report.total_sales, 100.0);
        assert!(!report.applied.get("customer").is_all());
    }

    #[test]
    fn fiscal_rank_is_derived_once() {
        let raw = crate::data::RawRecord::new()
            .with("Customer", "X")
            .with("Product", "P1")
            .with("Month", "January");
        let data = crate::pipeline::Dataset::<LifecycleRow>::from_raw(&[raw]);
        assert_eq!(data.rows()[0].fiscal_rank, Some(10));
    }

    #[test]
    fn months_follow_the_fiscal_calendar() {
        let report = Lifecycle::compute(&rows(), &filters("2023"));
        let months: Vec<&str> = report.monthly_sales.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["April", "December", "January"]);
    }

    #[test]
    fn product_share_is_relative_to_the_filtered_view() {
        let report = Lifecycle::compute(&rows(), &filters("2023"));
        assert_eq!(report.product_share[0].product, "P1");
        assert_eq!(report.product_share[0].sales, 130.0);
        let total: f64 = report.product_share.iter().map(|p| p.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn customer_pick_narrows_every_view() {
        let f = LifecycleFilters {
            customers: vec!["Y".into()],
            ..Default::default()
        };
        let report = Lifecycle::compute(&rows(), &f);
        assert_eq!(report.total_sales, 50.0);
        assert_eq!(report.sales_by_customer.len(), 1);
        assert_eq!(
            report.yearly_sales,
            vec![YearSales { year: "2023".into(), sales: 50.0 }]
        );
    }

    #[test]
    fn drill_down_restricts_months_to_the_year() {
        let f = LifecycleFilters {
            drill_down_year: Some("2022".into()),
            ..Default::default()
        };
        let report = Lifecycle::compute(&rows(), &f);
        assert_eq!(
            report.monthly_sales,
            vec![MonthSales { month: "April".into(), sales: 40.0 }]
        );
    }

    #[test]
    fn activity_counts_months_with_positive_sales() {
        let report = Lifecycle::compute(&rows(), &LifecycleFilters::default());
        let y2023 = report.sales_activity.iter().find(|a| a.year == "2023").unwrap();
        assert_eq!(y2023.active_months, 3);
        assert!((y2023.percentage - 25.0).abs() < 1e-9);
        // 2024 only has a zero sale
        assert!(report.sales_activity.iter().all(|a| a.year != "2024"));
    }

    #[test]
    fn stacked_years_ignore_the_product_pick() {
        let f = LifecycleFilters {
            product: Some("P1".into()),
            ..Default::default()
        };
        let report = Lifecycle::compute(&rows(), &f);
        assert_eq!(report.total_sales, 170.0);
        let y2023 = &report.year_product_sales[1];
        assert_eq!(y2023.year, "2023");
        assert_eq!(y2023.products.len(), 2);
    }
}
