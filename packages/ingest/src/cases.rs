//! The closed metric-case registry.
//!
//! Each case maps one reporting-API query shape (a dimension key and a
//! metric key) to one fact table. The worker iterates [`MetricCase::ALL`]
//! for every day it ingests; dispatch to the matching upsert operation
//! is a `match` in `rows`, built once at compile time rather than
//! resolved by name at runtime.

use strum_macros::{AsRefStr, Display, EnumString};

/// One configured metric case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum MetricCase {
    /// Hourly visit counts.
    VisitsByHour,
    /// Page views per device category.
    PageViewsByDevice,
    /// Visits per last-significant traffic source.
    VisitsByTrafficSource,
    /// Visitors per city, for the map view.
    VisitsByRegion,
}

impl MetricCase {
    /// Every configured case, in ingestion order.
    pub const ALL: [Self; 4] = [
        Self::VisitsByHour,
        Self::PageViewsByDevice,
        Self::VisitsByTrafficSource,
        Self::VisitsByRegion,
    ];

    /// The reporting-API dimension key this case queries.
    #[must_use]
    pub const fn dimensions(self) -> &'static str {
        match self {
            Self::VisitsByHour => "ym:s:hour",
            Self::PageViewsByDevice => "ym:pv:deviceCategory",
            Self::VisitsByTrafficSource => "ym:s:lastTrafficSource",
            Self::VisitsByRegion => "ym:s:regionCity",
        }
    }

    /// The reporting-API metric key this case queries.
    #[must_use]
    pub const fn metrics(self) -> &'static str {
        match self {
            Self::VisitsByHour | Self::VisitsByTrafficSource => "ym:s:visits",
            Self::PageViewsByDevice => "ym:pv:pageviews",
            Self::VisitsByRegion => "ym:s:users",
        }
    }
}
