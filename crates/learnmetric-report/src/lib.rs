//! learnmetric-report: HTML dashboard and CSV exports.

pub mod csv_export;
pub mod html;

pub use csv_export::{write_growth_csv, write_question_csv};
pub use html::{generate_html, write_html_report};
