//! Shared fixtures for integration tests.

#![allow(dead_code)]

use opsdash::data::RawRecord;

/// Builds a raw CSV row from `(column, cell)` pairs.
pub fn row(cells: &[(&str, &str)]) -> RawRecord {
    cells.iter().map(|(c, v)| (c.to_string(), v.to_string())).collect()
}

pub fn sales(customer: &str, product: &str, sales: &str, year: &str) -> RawRecord {
    row(&[
        ("Customer", customer),
        ("Product", product),
        ("Sales", sales),
        ("FinancialYear", year),
    ])
}

pub fn purchase_order(po: &str, status: &str, expected: &str, actual: &str) -> RawRecord {
    row(&[
        ("Date", "2024-03-01"),
        ("Raw Material", "Steel"),
        ("Vendor Name", "Acme"),
        ("PO Number", po),
        ("PO Status", status),
        ("Expected Delivery Date", expected),
        ("Actual Delivery Date", actual),
    ])
}

pub fn stock(date: &str, category: &str, item: &str) -> RawRecord {
    row(&[
        ("Date", date),
        ("Category", category),
        ("Item ID", item),
        ("Opening Stock", "10"),
        ("Closing Stock", "8"),
        ("Consumption", "2"),
    ])
}
