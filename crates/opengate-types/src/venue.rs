//! Venue records: the event catalog mirror and its priced seating sections.
//!
//! Events are owned by the outer catalog; this core keeps a read-only
//! mirror so payment item details and availability queries need no outward
//! calls. Sections are the pricing unit: every seat in a section costs the
//! section's price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EventId, SectionId};

/// Read-only mirror of one catalog event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
}

/// A priced subdivision of an event's seating, laid out as a fixed grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub event_id: EventId,
    /// Display name (`"Gold"`, `"Balcony"`, ...). Sections list in name order.
    pub name: String,
    /// Number of rows; rows are labeled `A`, `B`, ... at provisioning.
    pub rows: u32,
    /// Seats per row, numbered from 1.
    pub seats_per_row: u32,
    /// Per-seat price. Order totals capture this at order creation.
    pub price: Decimal,
}

impl Section {
    /// Total number of seats in this section's grid.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.seats_per_row)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Event {
    pub fn dummy(title: &str) -> Self {
        Self {
            id: EventId::new(),
            title: title.to_string(),
            starts_at: Utc::now() + chrono::Duration::days(30),
            venue: "Vodafone Arena".to_string(),
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Section {
    pub fn dummy(event_id: EventId, name: &str, rows: u32, seats_per_row: u32, price: Decimal) -> Self {
        Self {
            id: SectionId::new(),
            event_id,
            name: name.to_string(),
            rows,
            seats_per_row,
            price,
        }
    }
}
