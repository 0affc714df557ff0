//! Derived per-export aggregates: severity tally and asset×severity matrix.
//!
//! Both are recomputed from the finding list on every export and never cached.

use crate::finding::{Finding, Severity};

/// Count of findings per severity, indexed by [`Severity::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityTally {
    counts: [usize; 4],
}

impl SeverityTally {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = [0usize; 4];
        for f in findings {
            counts[f.severity.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, severity: Severity) -> usize {
        self.counts[severity.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Largest single count (0 for an empty tally).
    pub fn max(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(severity, count)` pairs in fixed severity order.
    pub fn iter(&self) -> impl Iterator<Item = (Severity, usize)> + '_ {
        Severity::ORDERED.iter().map(|s| (*s, self.get(*s)))
    }
}

/// One row of the asset×severity matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRow {
    pub asset: String,
    pub counts: [usize; 4],
}

impl AssetRow {
    pub fn get(&self, severity: Severity) -> usize {
        self.counts[severity.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Per-asset severity breakdown. Rows keep first-appearance order of assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSeverityMatrix {
    rows: Vec<AssetRow>,
}

impl AssetSeverityMatrix {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut rows: Vec<AssetRow> = Vec::new();
        for f in findings {
            let idx = match rows.iter().position(|r| r.asset == f.asset) {
                Some(i) => i,
                None => {
                    rows.push(AssetRow {
                        asset: f.asset.clone(),
                        counts: [0; 4],
                    });
                    rows.len() - 1
                }
            };
            rows[idx].counts[f.severity.index()] += 1;
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[AssetRow] {
        &self.rows
    }

    pub fn count(&self, asset: &str, severity: Severity) -> usize {
        self.rows
            .iter()
            .find(|r| r.asset == asset)
            .map(|r| r.get(severity))
            .unwrap_or(0)
    }

    /// Largest cell value across the whole matrix (0 when empty).
    pub fn max_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.counts.iter().copied())
            .max()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.rows.iter().map(AssetRow::total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
