// src/types/mod.rs
pub mod records;
pub mod report;

pub use records::{
    CandidateLink, CompanyPortal, CsvRecord, FailedPortal, FailedQuery, JobRecord, Platform,
};
pub use report::StageReport;
