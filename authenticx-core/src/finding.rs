//! Vulnerability finding model shared by the dashboard and the export pipeline.
//!
//! Field names on the wire follow the dashboard fixtures (`CVE_ID`,
//! `CVSS_Score`, ...) so fixture files load unchanged. Snake-case aliases are
//! accepted as well.

use serde::{Deserialize, Serialize};

/// One vulnerability record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Vendor or CVE style identifier.
    #[serde(rename = "CVE_ID", alias = "cve_id")]
    pub cve_id: String,
    /// Severity classification.
    #[serde(rename = "Severity", alias = "severity")]
    pub severity: Severity,
    /// CVSS base score (0.0-10.0). Not cross-checked against `severity`.
    #[serde(rename = "CVSS_Score", alias = "score", alias = "cvss_score")]
    pub score: f32,
    /// Free-text description of the vulnerability.
    #[serde(rename = "Vulnerability", alias = "description")]
    pub description: String,
    /// Affected service name and version.
    #[serde(rename = "Service", alias = "service")]
    pub service: String,
    /// Network port the service listens on.
    #[serde(rename = "Port", alias = "port")]
    pub port: u16,
    /// Affected asset (hostname).
    #[serde(rename = "Affected_Asset", alias = "asset")]
    pub asset: String,
}

impl Finding {
    /// Create a finding with the given identifier, severity and score.
    ///
    /// Location metadata starts empty; use the `with_*` builders to fill it.
    pub fn new(cve_id: impl Into<String>, severity: Severity, score: f32) -> Self {
        Self {
            cve_id: cve_id.into(),
            severity,
            score,
            description: String::new(),
            service: String::new(),
            port: 0,
            asset: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_service(mut self, service: impl Into<String>, port: u16) -> Self {
        self.service = service.into();
        self.port = port;
        self
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = asset.into();
        self
    }

    /// Table cells in column order: identifier, severity, score, description,
    /// service, port, asset.
    pub fn table_cells(&self) -> [String; 7] {
        [
            self.cve_id.clone(),
            self.severity.label().to_string(),
            format!("{}", self.score),
            self.description.clone(),
            self.service.clone(),
            self.port.to_string(),
            self.asset.clone(),
        ]
    }
}

/// Column headers matching [`Finding::table_cells`].
pub const TABLE_HEADERS: [&str; 7] = [
    "CVE_ID",
    "Severity",
    "CVSS Score",
    "Vulnerability",
    "Service",
    "Port",
    "Asset",
];

/// Ordinal risk category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

impl Severity {
    /// Fixed rendering order used by every chart, grid and tally.
    pub const ORDERED: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Position in [`Severity::ORDERED`].
    pub fn index(self) -> usize {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    /// Base chart color as sRGB.
    pub fn base_color(self) -> [u8; 3] {
        match self {
            Severity::Critical => [239, 68, 68],
            Severity::High => [249, 115, 22],
            Severity::Medium => [250, 204, 21],
            Severity::Low => [34, 197, 94],
        }
    }

    /// Derive a severity from a CVSS base score.
    ///
    /// Only used when building data; findings are never re-classified.
    pub fn from_score(score: f32) -> Self {
        match score {
            s if s >= 9.0 => Severity::Critical,
            s if s >= 7.0 => Severity::High,
            s if s >= 4.0 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_json_field_names() {
        let json = r#"{
            "CVE_ID": "CVE-2024-12345",
            "CVSS_Score": 9.1,
            "Vulnerability": "SQL Injection in login form",
            "Service": "Apache 2.4.49",
            "Port": 443,
            "Severity": "Critical",
            "Affected_Asset": "web.examplebank.com"
        }"#;
        let f: Finding = serde_json::from_str(json).unwrap();
        assert_eq!(f.cve_id, "CVE-2024-12345");
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.port, 443);
        assert_eq!(f.asset, "web.examplebank.com");
    }

    #[test]
    fn test_snake_case_aliases() {
        let json = r#"{"cve_id":"X-1","severity":"low","score":2.0,
            "description":"d","service":"s","port":22,"asset":"a"}"#;
        let f: Finding = serde_json::from_str(json).unwrap();
        assert_eq!(f.severity, Severity::Low);
        assert_eq!(f.description, "d");
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let json = r#"{"CVE_ID":"X","Severity":"Info","CVSS_Score":0.0,
            "Vulnerability":"","Service":"","Port":0,"Affected_Asset":""}"#;
        assert!(serde_json::from_str::<Finding>(json).is_err());
    }

    #[test]
    fn test_table_cells_order() {
        let f = Finding::new("CVE-1", Severity::High, 7.8)
            .with_description("XSS")
            .with_service("Express", 443)
            .with_asset("shopsecure.io");
        let cells = f.table_cells();
        assert_eq!(cells[0], "CVE-1");
        assert_eq!(cells[1], "High");
        assert_eq!(cells[2], "7.8");
        assert_eq!(cells[5], "443");
        assert_eq!(cells[6], "shopsecure.io");
        assert_eq!(cells.len(), TABLE_HEADERS.len());
    }

    #[test]
    fn test_severity_order_and_index() {
        for (i, s) in Severity::ORDERED.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
        assert_eq!(Severity::from_score(9.1), Severity::Critical);
        assert_eq!(Severity::from_score(6.5), Severity::Medium);
        assert_eq!(Severity::from_score(0.0), Severity::Low);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
    }
}
