mod quota;
mod registry;

pub use quota::{QuickTaskQuota, QuotaPolicy, DEFAULT_MAX_USES};
pub use registry::{Timer, TimerKind, TimerRegistry};
