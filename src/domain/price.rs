//! Dated close price representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Close prices of `points`, oldest first.
pub fn closes(points: &[PricePoint]) -> Vec<f64> {
    let mut sorted: Vec<&PricePoint> = points.iter().collect();
    sorted.sort_by_key(|p| p.date);
    sorted.iter().map(|p| p.close).collect()
}
