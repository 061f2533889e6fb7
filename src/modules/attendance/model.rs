pub use escola_models::attendance::*;
pub use escola_models::report_card::{AttendanceSummary, PeriodQuery};
