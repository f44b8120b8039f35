//! Deterministic scoring functions.
//!
//! Two pure functions feed the final report: a shareholder-quality
//! score derived from the investor labels on a company, and a blended
//! compatibility score combining the broad score, the tailored score
//! and shareholder quality.

use crate::catalog::Company;
use crate::error::{Result, TriageError};

/// Institutional-investor keywords. Case-sensitive substring match,
/// closed list.
pub const INSTITUTIONAL_KEYWORDS: [&str; 7] = [
    "Fund",
    "Capital",
    "Ventures",
    "Partners",
    "Institutional",
    "Pension",
    "Sovereign",
];

/// Per-shareholder increment for an institutional investor label.
const INSTITUTIONAL_INCREMENT: u32 = 15;

/// Per-shareholder increment for any other label.
const RETAIL_INCREMENT: u32 = 5;

/// Base shareholder score when nothing is known about the register.
const BASE_SCORE: u32 = 50;

/// Compatibility blend weights: broad confidence, tailored confidence,
/// shareholder quality.
const WEIGHT_CONFIDENCE: f64 = 0.35;
const WEIGHT_CONFIDENCE_B: f64 = 0.45;
const WEIGHT_SHAREHOLDER: f64 = 0.20;

/// Score the quality of a shareholder register.
///
/// Starts at 50; each label matching an institutional keyword adds 15,
/// any other label adds 5; the result is clamped at 100. An absent or
/// empty register scores exactly 50.
pub fn shareholder_score(shareholders: Option<&[String]>) -> u8 {
    let Some(labels) = shareholders else {
        return BASE_SCORE as u8;
    };

    let mut score = BASE_SCORE;
    for label in labels {
        if INSTITUTIONAL_KEYWORDS.iter().any(|kw| label.contains(kw)) {
            score += INSTITUTIONAL_INCREMENT;
        } else {
            score += RETAIL_INCREMENT;
        }
    }
    score.min(100) as u8
}

/// Blended compatibility score for a company.
///
/// `round(0.35 * confidence + 0.45 * confidence_b + 0.20 * shareholder_score)`,
/// rounded half-up. Only computable once the tailored stage has
/// assigned `confidence_b`.
///
/// # Errors
///
/// Returns [`TriageError::TailoredScoreMissing`] when the company has
/// no tailored score yet.
pub fn compatibility_score(company: &Company) -> Result<u8> {
    let confidence_b = company
        .confidence_b
        .ok_or(TriageError::TailoredScoreMissing(company.id))?;

    let shareholder = shareholder_score(company.shareholders.as_deref());

    let blended = WEIGHT_CONFIDENCE * f64::from(company.confidence)
        + WEIGHT_CONFIDENCE_B * f64::from(confidence_b)
        + WEIGHT_SHAREHOLDER * f64::from(shareholder);

    // Inputs are all in 0..=100, so the blend is too.
    Ok(blended.round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(confidence: u8, confidence_b: Option<u8>, shareholders: Option<Vec<&str>>) -> Company {
        Company {
            id: 1,
            name: "Testco".to_string(),
            confidence,
            confidence_b,
            shareholders: shareholders.map(|s| s.into_iter().map(String::from).collect()),
            revenue: None,
            ebitda: None,
            reasoning: None,
            logo: None,
        }
    }

    #[test]
    fn test_absent_register_scores_base() {
        assert_eq!(shareholder_score(None), 50);
        assert_eq!(shareholder_score(Some(&[])), 50);
    }

    #[test]
    fn test_mixed_register() {
        // One institutional match, one retail label.
        let labels = vec!["Acme Pension Fund".to_string(), "Jane Doe".to_string()];
        assert_eq!(shareholder_score(Some(&labels)), 70);
    }

    #[test]
    fn test_keyword_match_is_case_sensitive() {
        let labels = vec!["acme pension fund".to_string()];
        assert_eq!(shareholder_score(Some(&labels)), 55);
    }

    #[test]
    fn test_score_clamps_at_100() {
        let labels: Vec<String> = (0..10).map(|i| format!("Fund {i}")).collect();
        assert_eq!(shareholder_score(Some(&labels)), 100);
    }

    #[test]
    fn test_score_monotonic_in_institutional_matches() {
        let mut labels: Vec<String> = vec![];
        let mut last = shareholder_score(Some(&labels));
        for i in 0..6 {
            labels.push(format!("Sovereign Wealth {i}"));
            let next = shareholder_score(Some(&labels));
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn test_compatibility_blend() {
        // 0.35*80 + 0.45*90 + 0.20*50 = 28 + 40.5 + 10 = 78.5 -> 79
        let c = company(80, Some(90), None);
        assert_eq!(compatibility_score(&c).unwrap(), 79);
    }

    #[test]
    fn test_compatibility_bounds() {
        let lo = company(0, Some(0), None);
        // Shareholder base of 50 keeps the floor at 10.
        assert_eq!(compatibility_score(&lo).unwrap(), 10);

        let hi = company(100, Some(100), Some(vec!["Apex Capital", "Delta Fund", "Omega Partners", "Sigma Ventures"]));
        assert_eq!(compatibility_score(&hi).unwrap(), 100);
    }

    #[test]
    fn test_compatibility_requires_tailored_score() {
        let c = company(80, None, None);
        assert!(matches!(
            compatibility_score(&c),
            Err(TriageError::TailoredScoreMissing(1))
        ));
    }
}
