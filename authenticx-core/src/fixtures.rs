//! Built-in report fixtures and scan input loading.
//!
//! The dashboard ships hard-coded scan results per report id. These are the
//! same records, plus helpers to load findings and graphs from JSON files.

use crate::error::InputError;
use crate::finding::{Finding, Severity};
use crate::graph::Graph;
use serde::de::DeserializeOwned;
use std::path::Path;

/// A report as the dashboard hands it to the export pipeline.
#[derive(Debug, Clone)]
pub struct ReportFixture {
    pub id: String,
    pub target: String,
    pub findings: Vec<Finding>,
    pub graph: Graph,
}

/// Identifiers of the built-in reports.
pub const REPORT_IDS: [&str; 2] = ["1", "2"];

/// Look up a built-in report by id.
pub fn report(id: &str) -> Result<ReportFixture, InputError> {
    let (target, findings) = match id {
        "1" => (
            "examplebank.com",
            vec![
                Finding::new("CVE-2024-12345", Severity::Critical, 9.1)
                    .with_description("SQL Injection in login form")
                    .with_service("Apache 2.4.49", 443)
                    .with_asset("web.examplebank.com"),
                Finding::new("CVE-2023-56789", Severity::Medium, 6.5)
                    .with_description("Directory Traversal")
                    .with_service("Nginx 1.20", 80)
                    .with_asset("api.examplebank.com"),
            ],
        ),
        "2" => (
            "shopsecure.io",
            vec![
                Finding::new("CVE-2023-87654", Severity::High, 7.8)
                    .with_description("Cross-Site Scripting (XSS)")
                    .with_service("Node.js Express", 443)
                    .with_asset("shopsecure.io"),
            ],
        ),
        other => return Err(InputError::UnknownReport(other.to_string())),
    };

    let graph = Graph::from_findings(target, &findings);
    Ok(ReportFixture {
        id: id.to_string(),
        target: target.to_string(),
        findings,
        graph,
    })
}

/// Read a JSON array of findings.
pub fn load_findings(path: &Path) -> Result<Vec<Finding>, InputError> {
    read_json(path)
}

/// Read a JSON attack-path graph.
pub fn load_graph(path: &Path) -> Result<Graph, InputError> {
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| InputError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
