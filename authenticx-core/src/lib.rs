//! AuthenticX Core: scan data model, aggregates and configuration.
//!
//! This crate holds everything the report export pipeline consumes:
//!
//! - **Data model:** [`Finding`], [`Severity`] and the attack-path [`Graph`]
//! - **Aggregates:** [`SeverityTally`] and [`AssetSeverityMatrix`], recomputed per export
//! - **Configuration:** layered [`ExportConfig`] loading via `figment`
//! - **Fixtures:** the dashboard's built-in scan reports

pub mod aggregate;
pub mod config;
pub mod error;
pub mod finding;
pub mod fixtures;
pub mod graph;

pub use aggregate::{AssetRow, AssetSeverityMatrix, SeverityTally};
pub use config::{ConfigOverrides, ExportConfig, PageSize, load_config};
pub use error::{ConfigError, InputError};
pub use finding::{Finding, Severity, TABLE_HEADERS};
pub use graph::{Graph, Link, Node, NodeGroup};
