//! KnowBe4 Training Compliance Report Library
//!
//! Retrieves users, training campaigns and enrollments from the KnowBe4
//! reporting API, determines which users have not satisfied mandatory
//! training, and writes CSV compliance reports.
//!
//! # Modules
//!
//! - `analysis`: Compliance classification and metrics.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `fetcher`: Paginated API client.
//! - `models`: API records and report types.
//! - `pipeline`: End-to-end report generation.
//! - `report`: CSV report writer.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod report;
