//! Domain types shared across the service.

use std::collections::HashMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::Error;

/// One undecoded feed row: column name → raw cell text.
pub type RawRow = HashMap<String, String>;

/// Restaurant identifier, unique within one store generation.
pub type RestaurantId = i64;

// ── Restaurant ────────────────────────────────────────────────────────

/// A restaurant as published by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Delivery radius in km, always > 0.
    pub availability_radius: f64,
    pub open_hour: NaiveTime,
    pub close_hour: NaiveTime,
    /// Informational only.
    pub rating: f64,
}

impl Restaurant {
    /// Columns every feed document must carry.
    pub const COLUMNS: [&'static str; 7] = [
        "id",
        "latitude",
        "longitude",
        "availability_radius",
        "open_hour",
        "close_hour",
        "rating",
    ];

    /// Parse one feed row. `row_idx` is only used to label the error.
    pub fn from_row(row_idx: usize, row: &RawRow) -> Result<Self, Error> {
        let reject = |message: String| Error::RowParse {
            row: row_idx,
            message,
        };

        let id = field(row, "id")
            .map_err(&reject)?
            .parse::<RestaurantId>()
            .map_err(|e| reject(format!("id: {}", e)))?;
        let latitude = parse_f64(row, "latitude").map_err(&reject)?;
        let longitude = parse_f64(row, "longitude").map_err(&reject)?;
        let availability_radius = parse_f64(row, "availability_radius").map_err(&reject)?;
        if availability_radius <= 0.0 {
            return Err(reject(format!(
                "availability_radius must be > 0, got {}",
                availability_radius
            )));
        }
        let open_hour = parse_time(row, "open_hour").map_err(&reject)?;
        let close_hour = parse_time(row, "close_hour").map_err(&reject)?;
        let rating = parse_f64(row, "rating").map_err(&reject)?;

        Ok(Self {
            id,
            latitude,
            longitude,
            availability_radius,
            open_hour,
            close_hour,
            rating,
        })
    }

    /// Whether the restaurant is open at `now`.
    ///
    /// Hours are assumed to refer to the same day: a window with
    /// `open_hour > close_hour` never matches.
    pub fn is_open_at(&self, now: NaiveTime) -> bool {
        if self.open_hour <= self.close_hour {
            return self.open_hour <= now && now <= self.close_hour;
        }
        false
    }
}

fn field<'a>(row: &'a RawRow, name: &str) -> Result<&'a str, String> {
    row.get(name)
        .map(|v| v.trim())
        .ok_or_else(|| format!("missing column {}", name))
}

fn parse_f64(row: &RawRow, name: &str) -> Result<f64, String> {
    let raw = field(row, name)?;
    let value = raw
        .parse::<f64>()
        .map_err(|e| format!("{}: {} ({:?})", name, e, raw))?;
    if !value.is_finite() {
        return Err(format!("{}: not a finite number ({:?})", name, raw));
    }
    Ok(value)
}

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

fn parse_time(row: &RawRow, name: &str) -> Result<NaiveTime, String> {
    let raw = field(row, name)?;
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("{}: invalid time of day ({:?})", name, raw))
}

// ── Query output ──────────────────────────────────────────────────────

/// Restaurants that can deliver to a coordinate.
///
/// `count == ids.len()` always; use [`QueryResult::from_ids`] to build one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(rename = "restaurant_count")]
    pub count: usize,
    #[serde(rename = "restaurant_ids")]
    pub ids: Vec<RestaurantId>,
}

impl QueryResult {
    pub fn from_ids(ids: Vec<RestaurantId>) -> Self {
        Self {
            count: ids.len(),
            ids,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
