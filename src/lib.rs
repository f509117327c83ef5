//! creg: Council Registry
//!
//! A command-line registry for a municipal council's fixed assets, garage
//! permits, requisition forms and citizen service requests, kept as plain
//! YAML files. Assets, permits and requisitions carry sequential,
//! human-readable document numbers allocated per office, year and category.

pub mod cli;
pub mod core;
pub mod entities;
pub mod print;
pub mod telemetry;
