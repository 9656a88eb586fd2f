//! Services for discovery, resolution, caching and aggregation

pub mod aggregator;
pub mod cache;
pub mod consistency;
pub mod dashboard;
pub mod discovery;
pub mod resolver;
pub mod view_state;

pub use aggregator::{Aggregator, DatasetSummary, PartnerRow, WeekTrend};
pub use cache::DatasetCache;
pub use consistency::{
    checks_from_config, CalendarWindowCheck, ConsistencyCheck, ConsistencyIssue, WeekRangeRule,
};
pub use dashboard::{Dashboard, LoadEvent};
pub use discovery::PeriodDiscovery;
pub use resolver::DatasetResolver;
pub use view_state::{RequestTicket, ViewState};
