pub mod cache;
pub mod clock;
pub mod monitor;
pub mod report;

pub use cache::{CacheEntry, MetadataCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{
    CycleReporter, MonitorSettings, NullReporter, RunOutcome, RunSummary, StockMonitor,
};
pub use report::{MetadataSource, ReportRow, StatusReport};
