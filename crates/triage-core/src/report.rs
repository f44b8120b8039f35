//! Final report aggregation over the approved working set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Company, CompanyId};
use crate::error::{Result, TriageError};
use crate::scoring::{compatibility_score, shareholder_score};

/// Constant status label stamped on every finalized report.
pub const REPORT_STATUS: &str = "portfolio approved";

/// One ranked entry of the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// 1-based rank in compatibility order.
    pub rank: u32,
    pub company_id: CompanyId,
    pub name: String,
    /// Blended compatibility score driving the ordering.
    pub compatibility: u8,
    /// Component scores behind the blend.
    pub confidence: u8,
    pub confidence_b: u8,
    pub shareholder: u8,
    // Display-only fields carried through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Summary statistics over the report entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Integer mean of the compatibility scores, rounded half-up.
    pub average_compatibility: u8,
    pub max_compatibility: u8,
    pub entry_count: usize,
    pub status: String,
    pub generated_at: DateTime<Utc>,
}

/// The finalized, ordered report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
    pub summary: ReportSummary,
}

/// Aggregate the approved companies into a ranked report.
///
/// `approved` must be in approval order; score ties preserve it. Every
/// company must carry a tailored score (guaranteed once the tailored
/// stage has run).
///
/// # Errors
///
/// Returns [`TriageError::EmptyApprovedSet`] on an empty input — the
/// review state machine never finalizes without at least one approval,
/// so reaching that error indicates a sequencing bug in the caller.
pub fn build_report(approved: &[Company], generated_at: DateTime<Utc>) -> Result<Report> {
    if approved.is_empty() {
        return Err(TriageError::EmptyApprovedSet);
    }

    let mut scored: Vec<(u8, &Company)> = Vec::with_capacity(approved.len());
    for company in approved {
        scored.push((compatibility_score(company)?, company));
    }

    // Stable sort: ties keep approval order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let entries: Vec<ReportEntry> = scored
        .iter()
        .enumerate()
        .map(|(i, (compatibility, company))| ReportEntry {
            rank: i as u32 + 1,
            company_id: company.id,
            name: company.name.clone(),
            compatibility: *compatibility,
            confidence: company.confidence,
            // compatibility_score above already required the tailored score.
            confidence_b: company.confidence_b.unwrap_or(company.confidence),
            shareholder: shareholder_score(company.shareholders.as_deref()),
            revenue: company.revenue.clone(),
            ebitda: company.ebitda.clone(),
            reasoning: company.reasoning.clone(),
            logo: company.logo.clone(),
        })
        .collect();

    let total: u32 = entries.iter().map(|e| u32::from(e.compatibility)).sum();
    let average = (f64::from(total) / entries.len() as f64).round() as u8;
    let max = entries
        .iter()
        .map(|e| e.compatibility)
        .max()
        .ok_or(TriageError::EmptyApprovedSet)?;

    Ok(Report {
        entries,
        summary: ReportSummary {
            average_compatibility: average,
            max_compatibility: max,
            entry_count: approved.len(),
            status: REPORT_STATUS.to_string(),
            generated_at,
        },
    })
}
