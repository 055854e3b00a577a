//! In-memory analytics over field-audit task records: filtering, weekly
//! trends, top-K rankings, owner cross-tabulation, KPIs and drill-down.

pub mod calendar;
pub mod config;
pub mod drilldown;
pub mod error;
pub mod export;
pub mod filter;
pub mod frequency;
pub mod ingest;
pub mod kpi;
pub mod matrix;
pub mod models;
pub mod report;
pub mod trend;

pub use calendar::{WeekCalendar, WeekConfig, WeekLabel};
pub use error::AnalyticsError;
pub use filter::{filter_tasks, FilterSet, TaskFilter};
pub use models::{MultiValue, Task, TaskField};
