//! Store Inventory Dashboard
//! Turnover, ABC classification and stock against minimum stock level (MSL).

use crate::calendar::{DateFormat, YearMonth};
use crate::charts::{shape, SeriesOrder};
use crate::data::{FieldSpec, NormalizedRecord, NumberPolicy, Schema};
use crate::filter::{FieldOptions, FilterChain, FilterField, FilterSpec, Selection};
use crate::pipeline::{Dashboard, TypedRow};
use crate::stats::{average, group_by, ratio, total, Measure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bucket for rows whose ABC class or category is blank.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRow {
    pub date: NaiveDate,
    pub period: YearMonth,
    pub opening_stock: f64,
    pub closing_stock: f64,
    pub consumption: f64,
    pub msl: f64,
    pub turnover_ratio: f64,
    pub category: Option<String>,
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub abc_class: Option<String>,
    pub unit: Option<String>,
    pub price: f64,
}

impl TypedRow for InventoryRow {
    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::date("date", &["Date"], DateFormat::DayMonthYear).required(),
            FieldSpec::number("opening", &["Opening Stock"], NumberPolicy::Exclude).required(),
            FieldSpec::number("closing", &["Closing Stock"], NumberPolicy::ZeroIfInvalid),
            FieldSpec::number("consumption", &["Consumption"], NumberPolicy::ZeroIfInvalid),
            FieldSpec::number("msl", &["MSL"], NumberPolicy::ZeroIfInvalid),
            FieldSpec::number(
                "turnover",
                &["Inventory Turnover ratio", "Inventory Turnover Ratio"],
                NumberPolicy::ZeroIfInvalid,
            ),
            FieldSpec::text("category", &["Category"]),
            FieldSpec::text("item_id", &["Item ID"]),
            FieldSpec::text("item_name", &["Item Name"]),
            FieldSpec::text("abc_class", &["ABC Class"]),
            FieldSpec::text("unit", &["Unit"]),
            FieldSpec::number("price", &["Price", "Unit Price", "price"], NumberPolicy::ZeroIfInvalid),
        ])
    }

    fn from_record(record: &NormalizedRecord) -> Option<Self> {
        let date = record.date("date")?;
        let owned = |field: &str| record.text(field).map(str::to_string);
        Some(Self {
            date,
            period: YearMonth::of(date),
            opening_stock: record.number("opening")?,
            closing_stock: record.number("closing").unwrap_or(0.0),
            consumption: record.number("consumption").unwrap_or(0.0),
            msl: record.number("msl").unwrap_or(0.0),
            turnover_ratio: record.number("turnover").unwrap_or(0.0),
            category: owned("category"),
            item_id: owned("item_id"),
            item_name: owned("item_name"),
            abc_class: owned("abc_class"),
            unit: owned("unit"),
            price: record.number("price").unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryFilters {
    pub category: Option<String>,
    pub item_id: Option<String>,
    /// Two-digit month, e.g. `"03"`.
    pub month: Option<String>,
    /// Two-digit day of month.
    pub day: Option<String>,
    /// Class whose items are listed in the ABC table.
    pub abc_class: Option<String>,
}

impl InventoryFilters {
    fn spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with("category", Selection::single(self.category.as_deref()))
            .with("item_id", Selection::single(self.item_id.as_deref()))
            .with("month", Selection::single(self.month.as_deref()))
            .with("day", Selection::single(self.day.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassShare {
    pub class: String,
    pub items: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassItem {
    pub item_id: String,
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price: f64,
    pub closing_stock: f64,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTurnover {
    pub month: String,
    pub average_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStock {
    pub day: String,
    pub total_closing: f64,
    pub total_msl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyConsumption {
    pub day: String,
    pub consumption: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReport {
    pub inventory_turnover: f64,
    pub total_consumption: f64,
    pub average_inventory: f64,
    pub abc_distribution: Vec<ClassShare>,
    pub class_items: Vec<ClassItem>,
    pub monthly_turnover: Vec<MonthlyTurnover>,
    pub daily_stock: Vec<DailyStock>,
    pub days_below_msl: usize,
    pub daily_consumption: Vec<DailyConsumption>,
    pub category_counts: Vec<CategoryCount>,
    pub options: Vec<FieldOptions>,
    pub applied: FilterSpec,
}

pub struct Inventory;

fn chain() -> FilterChain<InventoryRow> {
    FilterChain::new(vec![
        FilterField::text("category", |r: &InventoryRow| r.category.clone()),
        FilterField::text("item_id", |r: &InventoryRow| r.item_id.clone()),
        FilterField::text("month", |r: &InventoryRow| Some(r.date.format("%m").to_string())).sorted(),
        FilterField::text("day", |r: &InventoryRow| Some(r.date.format("%d").to_string())).sorted(),
    ])
}

fn day_label(date: &NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

impl Dashboard for Inventory {
    const NAME: &'static str = "inventory";
    type Row = InventoryRow;
    type Filters = InventoryFilters;
    type Output = InventoryReport;

    fn compute(rows: &[InventoryRow], filters: &InventoryFilters) -> InventoryReport {
        let view = chain().apply(rows, &filters.spec());

        let total_consumption = total(view.iter(), |r| Some(r.consumption));
        let average_inventory = average(view.iter(), |r| {
            Some((r.opening_stock + r.closing_stock) / 2.0)
        });

        let by_class = group_by(
            view.iter(),
            |r| Some(r.abc_class.clone().unwrap_or_else(|| UNKNOWN.to_string())),
            &[Measure::distinct("items", |r: &InventoryRow| r.item_id.clone())],
        );
        let abc_distribution = shape(&by_class, SeriesOrder::Encounter, None, |g| ClassShare {
            class: g.key.clone(),
            items: g.get("items") as usize,
            percentage: by_class.share(g, "items"),
        });

        let class_items = match filters.abc_class.as_deref() {
            Some(class) => latest_items(view.iter(), class),
            None => Vec::new(),
        };

        let by_month = group_by(
            view.iter(),
            |r| Some(r.period),
            &[Measure::average("ratio", |r: &InventoryRow| Some(r.turnover_ratio))],
        );
        let monthly_turnover = shape(&by_month, SeriesOrder::KeyAsc, None, |g| MonthlyTurnover {
            month: g.key.long_label(),
            average_ratio: g.get("ratio"),
        });

        let by_day = group_by(
            view.iter(),
            |r| Some(r.date),
            &[
                Measure::sum("closing", |r: &InventoryRow| Some(r.closing_stock)),
                Measure::sum("msl", |r: &InventoryRow| Some(r.msl)),
                Measure::sum("consumption", |r: &InventoryRow| Some(r.consumption)),
            ],
        );
        let daily_stock = shape(&by_day, SeriesOrder::KeyAsc, None, |g| DailyStock {
            day: day_label(&g.key),
            total_closing: g.get("closing"),
            total_msl: g.get("msl"),
        });
        let days_below_msl = daily_stock
            .iter()
            .filter(|d| d.total_closing < d.total_msl)
            .count();
        let daily_consumption = shape(&by_day, SeriesOrder::KeyAsc, None, |g| DailyConsumption {
            day: day_label(&g.key),
            consumption: g.get("consumption"),
        });

        let by_category = group_by(
            view.iter(),
            |r| Some(r.category.clone().unwrap_or_else(|| UNKNOWN.to_string())),
            &[],
        );
        let category_counts = shape(&by_category, SeriesOrder::Encounter, None, |g| CategoryCount {
            category: g.key.clone(),
            rows: g.rows,
        });

        InventoryReport {
            inventory_turnover: ratio(total_consumption, average_inventory),
            total_consumption,
            average_inventory,
            abc_distribution,
            class_items,
            monthly_turnover,
            daily_stock,
            days_below_msl,
            daily_consumption,
            category_counts,
            options: view.options.clone(),
            applied: view.resolved.clone(),
        }
    }
}

/// Items of one ABC class, each with the closing stock of its most recent row.
fn latest_items<'a>(rows: impl Iterator<Item = &'a InventoryRow>, class: &str) -> Vec<ClassItem> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut items: Vec<ClassItem> = Vec::new();

    for row in rows.filter(|r| r.abc_class.as_deref() == Some(class)) {
        let Some(id) = row.item_id.as_deref() else {
            continue;
        };
        match index.get(id) {
            Some(&i) => {
                if row.date > items[i].as_of {
                    items[i].closing_stock = row.closing_stock;
                    items[i].as_of = row.date;
                }
            }
            None => {
                index.insert(id, items.len());
                items.push(ClassItem {
                    item_id: id.to_string(),
                    item_name: row.item_name.clone(),
                    category: row.category.clone(),
                    unit: row.unit.clone(),
                    price: row.price,
                    closing_stock: row.closing_stock,
                    as_of: row.date,
                });
            }
        }
    }
    items
}
