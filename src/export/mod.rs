pub mod layout;
pub mod pdf;
pub mod excel;
pub mod parsed;

pub use excel::{generate_summary, SummaryRow};
pub use parsed::write_parsed_csv;
pub use pdf::{generate_report, ReportData};
