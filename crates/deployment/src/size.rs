//! Topology size codec.
//!
//! The control plane reports memory as an integer number of megabytes. Users
//! write capacities like `"1g"` or `"512m"`. [`encode`] picks the whole
//! gigabyte form when the value divides evenly and [`decode`] accepts both
//! forms, so `decode(encode(u)) == u` for every value the API can report.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Raw units (megabytes) per gigabyte.
pub const UNITS_PER_GIGABYTE: u32 = 1024;

/// Resource name the API uses for memory-sized topology.
pub const MEMORY_RESOURCE: &str = "memory";

static CAPACITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([gmGM])$").expect("Invalid capacity regex"));

/// Render raw units as a capacity string.
pub fn encode(units: u32) -> String {
    if units % UNITS_PER_GIGABYTE == 0 {
        format!("{}g", units / UNITS_PER_GIGABYTE)
    } else {
        format!("{units}m")
    }
}

/// Parse a capacity string into raw units.
pub fn decode(capacity: &str) -> Result<u32> {
    let invalid = || Error::InvalidCapacityFormat {
        value: capacity.to_string(),
    };

    let caps = CAPACITY.captures(capacity).ok_or_else(invalid)?;
    let value: u32 = caps[1].parse().map_err(|_| invalid())?;

    match &caps[2] {
        "g" | "G" => value.checked_mul(UNITS_PER_GIGABYTE).ok_or_else(invalid),
        _ => Ok(value),
    }
}
