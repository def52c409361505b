//! Structured safety-case content extracted from a customer PDF
//!
//! Known fields are a strict schema; anything the extractor produced beyond
//! them lands in the explicitly typed `additional_sections` map. Extraction
//! itself happens outside this workspace; the minimum viable payload has a
//! company name and a robot model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One hazard row in the risk assessment table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub hazard: String,
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<String>,
    pub mitigation: String,
}

/// One standard row in the compliance table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStandard {
    pub standard: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
}

/// One test row in the testing results table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestingResult {
    pub test_name: String,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The full payload consumed by the template populator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCaseData {
    pub company_name: String,
    pub robot_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sil_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepared_by: Option<String>,
    #[serde(default)]
    pub risk_assessments: Vec<RiskAssessment>,
    #[serde(default)]
    pub compliance_standards: Vec<ComplianceStandard>,
    #[serde(default)]
    pub testing_results: Vec<TestingResult>,
    /// Free-form sections; an empty map means "section absent".
    #[serde(default)]
    pub cybersecurity: BTreeMap<String, String>,
    #[serde(default)]
    pub ai_machine_learning: BTreeMap<String, String>,
    #[serde(default)]
    pub maintenance_safety: BTreeMap<String, String>,
    /// Extractor output with no dedicated field, keyed by lowercased
    /// placeholder name.
    #[serde(default)]
    pub additional_sections: BTreeMap<String, String>,
}

impl SafetyCaseData {
    /// Whether the payload meets the minimum bar for template population.
    #[must_use]
    pub fn is_viable(&self) -> bool {
        !self.company_name.trim().is_empty() && !self.robot_model.trim().is_empty()
    }

    /// Resolve a scalar placeholder token (e.g. `COMPANY_NAME`).
    ///
    /// Known fields first, then `additional_sections` under the lowercased
    /// token. `None` means the placeholder stays literal in the output.
    #[must_use]
    pub fn scalar(&self, token: &str) -> Option<&str> {
        let known = match token {
            "COMPANY_NAME" => Some(self.company_name.as_str()),
            "ROBOT_MODEL" => Some(self.robot_model.as_str()),
            "SIL_RATING" => self.sil_rating.as_deref(),
            "PERFORMANCE_LEVEL" => self.performance_level.as_deref(),
            "OPERATING_ENVIRONMENT" => self.operating_environment.as_deref(),
            "CERTIFICATION_STATUS" => self.certification_status.as_deref(),
            "ASSESSMENT_DATE" => self.assessment_date.as_deref(),
            "PREPARED_BY" => self.prepared_by.as_deref(),
            _ => None,
        };
        known
            .or_else(|| self.additional_sections.get(&token.to_lowercase()).map(String::as_str))
            .filter(|v| !v.is_empty())
    }

    /// Rows for a repeated template block, keyed by per-row placeholder
    /// token. `None` means the marker is not one of ours and the block is
    /// static content.
    #[must_use]
    pub fn repeat_rows(&self, marker: &str) -> Option<Vec<BTreeMap<String, String>>> {
        match marker {
            "risk-row" => Some(
                self.risk_assessments
                    .iter()
                    .map(|r| {
                        let mut row = BTreeMap::new();
                        row.insert("HAZARD".to_string(), r.hazard.clone());
                        row.insert("SEVERITY".to_string(), r.severity.clone());
                        row.insert(
                            "LIKELIHOOD".to_string(),
                            r.likelihood.clone().unwrap_or_default(),
                        );
                        row.insert("MITIGATION".to_string(), r.mitigation.clone());
                        row
                    })
                    .collect(),
            ),
            "standard-row" => Some(
                self.compliance_standards
                    .iter()
                    .map(|s| {
                        let mut row = BTreeMap::new();
                        row.insert("STANDARD".to_string(), s.standard.clone());
                        row.insert(
                            "STANDARD_DESCRIPTION".to_string(),
                            s.description.clone().unwrap_or_default(),
                        );
                        row.insert("STANDARD_STATUS".to_string(), s.status.clone());
                        row
                    })
                    .collect(),
            ),
            "test-row" => Some(
                self.testing_results
                    .iter()
                    .map(|t| {
                        let mut row = BTreeMap::new();
                        row.insert("TEST_NAME".to_string(), t.test_name.clone());
                        row.insert("TEST_RESULT".to_string(), t.result.clone());
                        row.insert("TEST_DATE".to_string(), t.date.clone().unwrap_or_default());
                        row.insert(
                            "TEST_NOTES".to_string(),
                            t.notes.clone().unwrap_or_default(),
                        );
                        row
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Content for a conditional `<section>` by element id.
    ///
    /// `None` means the id is not a conditional section (static content);
    /// `Some` with an empty map means "drop the section".
    #[must_use]
    pub fn section(&self, id: &str) -> Option<&BTreeMap<String, String>> {
        match id {
            "cybersecurity" => Some(&self.cybersecurity),
            "ai-machine-learning" => Some(&self.ai_machine_learning),
            "maintenance-safety" => Some(&self.maintenance_safety),
            _ => None,
        }
    }
}
