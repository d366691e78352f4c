pub mod detector;

pub use detector::{detect_zones, swing_points, Freshness, Zone, ZoneKind, ZoneSet};
