pub use escola_models::grades::*;
pub use escola_models::report_card::{
    DateRange, PeriodQuery, ReportCardResponse, StudentRef, SubjectReport,
};
