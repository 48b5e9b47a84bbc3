//! Fixed availability-zone tables for the provider regions this tool
//! knows how to provision into.

static US_EAST_1_ZONES: &[&str] = &[
    "us-east-1a",
    "us-east-1b",
    "us-east-1c",
    "us-east-1d",
    "us-east-1e",
];

static US_WEST_1_ZONES: &[&str] = &["us-west-1a", "us-west-1b", "us-west-1c"];

/// The availability zones of a region, in provisioning order.
#[must_use]
pub fn zones_for_region(region: &str) -> Option<&'static [&'static str]> {
    match region {
        "us-east-1" => Some(US_EAST_1_ZONES),
        "us-west-1" => Some(US_WEST_1_ZONES),
        _ => None,
    }
}

/// Whether the zone appears in any known region's table.
#[must_use]
pub fn is_known_zone(zone: &str) -> bool {
    US_EAST_1_ZONES.contains(&zone) || US_WEST_1_ZONES.contains(&zone)
}
