//! Shared fixtures for caseflow tests
//!
//! Builders and canned payloads used across the workspace's test suites.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;

use caseflow_core::{Backoffice, NewLead};
use caseflow_model::{ComplianceStandard, RiskAssessment, SafetyCaseData, TestingResult};
use caseflow_store::{KvStore, MemoryStore};

/// Document template exercising every construct: scalar placeholders,
/// the three repeated tables, and the conditional sections.
pub const STANDARD_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>[COMPANY_NAME] Safety Case</title></head>
<body>
<h1>[COMPANY_NAME] — [ROBOT_MODEL]</h1>
<p>SIL: [SIL_RATING], PL: [PERFORMANCE_LEVEL]</p>
<p>Prepared by [PREPARED_BY] on [ASSESSMENT_DATE]</p>
<table>
<tr><th>Hazard</th><th>Severity</th><th>Likelihood</th><th>Mitigation</th></tr>
<tr data-template="risk-row"><td>[HAZARD]</td><td>[SEVERITY]</td><td>[LIKELIHOOD]</td><td>[MITIGATION]</td></tr>
</table>
<table>
<tr><th>Standard</th><th>Description</th><th>Status</th></tr>
<tr data-template="standard-row"><td>[STANDARD]</td><td>[STANDARD_DESCRIPTION]</td><td>[STANDARD_STATUS]</td></tr>
</table>
<table>
<tr><th>Test</th><th>Result</th><th>Date</th><th>Notes</th></tr>
<tr data-template="test-row"><td>[TEST_NAME]</td><td>[TEST_RESULT]</td><td>[TEST_DATE]</td><td>[TEST_NOTES]</td></tr>
</table>
<!-- Cybersecurity -->
<section id="cybersecurity"><h2>Cybersecurity</h2><p>[CYBER_SUMMARY]</p></section>
<!-- AI / ML -->
<section id="ai-machine-learning"><h2>AI &amp; ML</h2><p>[AI_SUMMARY]</p></section>
<!-- Maintenance -->
<section id="maintenance-safety"><h2>Maintenance</h2><p>[MAINTENANCE_SUMMARY]</p></section>
</body>
</html>
"#;

pub const SAMPLE_CSV: &str = "\
Company Name,Contact,Email,Website,Reason\n\
Acme Robotics,Jo Field,jo@acme.example,https://acme.example,Fits ISO 10218 niche\n\
Borg Automation,Sam Reyes,sam@borg.example,,Referral\n\
Acme Robotics,Jo Again,JO@acme.example,,Duplicate of row one\n\
No Email Co,Pat Doe,not-an-email,,Dropped for missing address\n";

/// Write `STANDARD_TEMPLATE` as `{template_type}.html` under `dir`.
pub fn write_template(dir: &Path, template_type: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(format!("{template_type}.html")), STANDARD_TEMPLATE).unwrap();
}

/// A fully populated extraction payload.
pub fn full_safety_case() -> SafetyCaseData {
    let mut data = SafetyCaseData {
        company_name: "Acme Robotics".to_string(),
        robot_model: "AMR-7".to_string(),
        sil_rating: Some("SIL 2".to_string()),
        performance_level: Some("PL d".to_string()),
        operating_environment: Some("indoor warehouse".to_string()),
        certification_status: Some("pending".to_string()),
        assessment_date: Some("2025-03-14".to_string()),
        prepared_by: Some("J. Field".to_string()),
        ..Default::default()
    };
    data.risk_assessments.push(RiskAssessment {
        hazard: "pinch point at lift".to_string(),
        severity: "high".to_string(),
        likelihood: Some("occasional".to_string()),
        mitigation: "interlocked guarding".to_string(),
    });
    data.risk_assessments.push(RiskAssessment {
        hazard: "collision with personnel".to_string(),
        severity: "medium".to_string(),
        likelihood: None,
        mitigation: "LIDAR safety field".to_string(),
    });
    data.compliance_standards.push(ComplianceStandard {
        standard: "ISO 10218-1".to_string(),
        description: Some("Industrial robots".to_string()),
        status: "compliant".to_string(),
    });
    data.testing_results.push(TestingResult {
        test_name: "e-stop latency".to_string(),
        result: "pass".to_string(),
        date: Some("2025-03-01".to_string()),
        notes: None,
    });
    data.cybersecurity
        .insert("cyber_summary".to_string(), "network segmented".to_string());
    data
}

/// The smallest payload that still passes viability.
pub fn minimal_safety_case() -> SafetyCaseData {
    SafetyCaseData {
        company_name: "Acme Robotics".to_string(),
        robot_model: "AMR-7".to_string(),
        ..Default::default()
    }
}

pub fn sample_lead(email: &str) -> NewLead {
    NewLead {
        name: "Jo Field".to_string(),
        company: "Acme Robotics".to_string(),
        email: email.to_string(),
        ..Default::default()
    }
}

/// In-memory back-office over `template_dir`.
pub fn memory_backoffice(template_dir: &Path) -> Backoffice {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    Backoffice::new(store, template_dir.to_path_buf())
}
