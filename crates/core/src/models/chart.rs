use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single point of the portfolio value series.
///
/// The core computes these; the frontend only renders them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Midnight UTC for historical days, the request time for the live point
    pub t: DateTime<Utc>,

    /// Total holdings value in the display currency
    pub v: f64,
}
