//! learnmetric-core: Answer decoding, scoring, and cohort aggregation.
//!
//! This crate turns a baseline/endline assessment workbook into scored
//! per-phase tables, a matched growth table, and per-question accuracy.
//! Reading workbooks from disk lives in `learnmetric-workbook`.

pub mod answer_key;
pub mod cache;
pub mod cohort;
pub mod decoder;
pub mod error;
pub mod model;
pub mod questions;
pub mod report;
pub mod scorer;
pub mod statistics;
pub mod traits;
