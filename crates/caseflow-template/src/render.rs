//! Rendering a compiled template against extracted data

use std::collections::BTreeMap;

use caseflow_model::SafetyCaseData;

use crate::escape::escape_html;
use crate::Node;

pub(crate) fn render_nodes(nodes: &[Node], data: &SafetyCaseData) -> String {
    let mut out = String::new();
    render_into(&mut out, nodes, data, None);
    out
}

/// `scope` overlays row/section values on top of the global scalars.
fn render_into(
    out: &mut String,
    nodes: &[Node],
    data: &SafetyCaseData,
    scope: Option<&BTreeMap<String, String>>,
) {
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Placeholder(token) => match resolve(token, data, scope) {
                Some(value) => out.push_str(&escape_html(&value)),
                // Unmatched placeholders stay literal in the output.
                None => {
                    out.push('[');
                    out.push_str(token);
                    out.push(']');
                }
            },
            Node::Repeat { marker, body } => match data.repeat_rows(marker) {
                // Zero rows render nothing; no stale template row leaks.
                Some(rows) => {
                    for row in rows {
                        render_into(out, body, data, Some(&row));
                    }
                }
                // Not one of our markers; the element is static content.
                None => render_into(out, body, data, scope),
            },
            Node::Section { id, open_tag, body } => match data.section(id) {
                Some(content) if content.is_empty() => {}
                Some(content) => {
                    out.push_str(open_tag);
                    render_into(out, body, data, Some(content));
                    out.push_str("</section>");
                }
                // Ids without conditional data are always rendered.
                None => {
                    out.push_str(open_tag);
                    render_into(out, body, data, scope);
                    out.push_str("</section>");
                }
            },
        }
    }
}

/// Scope first (exact, then lowercased key), then the global scalars.
fn resolve(
    token: &str,
    data: &SafetyCaseData,
    scope: Option<&BTreeMap<String, String>>,
) -> Option<String> {
    if let Some(scope) = scope {
        if let Some(v) = scope
            .get(token)
            .or_else(|| scope.get(&token.to_lowercase()))
        {
            if !v.is_empty() {
                return Some(v.clone());
            }
        }
    }
    data.scalar(token).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use crate::Template;
    use caseflow_model::{RiskAssessment, SafetyCaseData};
    use pretty_assertions::assert_eq;

    fn data() -> SafetyCaseData {
        SafetyCaseData {
            company_name: "Acme & Sons".to_string(),
            robot_model: "AMR-7".to_string(),
            sil_rating: Some("SIL 2".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn scalar_substitution_escapes_html() {
        let tpl = Template::parse("<h1>[COMPANY_NAME]</h1>").unwrap();
        assert_eq!(tpl.render(&data()), "<h1>Acme &amp; Sons</h1>");
    }

    #[test]
    fn absent_field_leaves_token_literal() {
        let tpl = Template::parse("<p>[PERFORMANCE_LEVEL]</p>").unwrap();
        assert_eq!(tpl.render(&data()), "<p>[PERFORMANCE_LEVEL]</p>");
    }

    #[test]
    fn empty_repeat_array_renders_nothing() {
        let tpl = Template::parse(
            "<table><tr data-template=\"risk-row\"><td>[HAZARD]</td></tr></table>",
        )
        .unwrap();
        let html = tpl.render(&data());
        assert_eq!(html, "<table></table>");
        assert!(!html.contains("data-template"));
        assert!(!html.contains("[HAZARD]"));
    }

    #[test]
    fn repeat_rows_cloned_per_element() {
        let mut d = data();
        d.risk_assessments = vec![
            RiskAssessment {
                hazard: "pinch point".to_string(),
                severity: "high".to_string(),
                likelihood: None,
                mitigation: "guarding".to_string(),
            },
            RiskAssessment {
                hazard: "collision".to_string(),
                severity: "medium".to_string(),
                likelihood: Some("rare".to_string()),
                mitigation: "lidar stop".to_string(),
            },
        ];
        let tpl = Template::parse(
            "<table><tr data-template=\"risk-row\"><td>[HAZARD]</td><td>[SEVERITY]</td></tr></table>",
        )
        .unwrap();
        assert_eq!(
            tpl.render(&d),
            "<table><tr><td>pinch point</td><td>high</td></tr>\
             <tr><td>collision</td><td>medium</td></tr></table>"
        );
    }

    #[test]
    fn empty_optional_row_field_falls_back_to_literal_token() {
        let mut d = data();
        d.risk_assessments = vec![RiskAssessment {
            hazard: "h".to_string(),
            severity: "s".to_string(),
            likelihood: None,
            mitigation: "m".to_string(),
        }];
        let tpl =
            Template::parse("<tr data-template=\"risk-row\"><td>[LIKELIHOOD]</td></tr>").unwrap();
        // Row value is empty, and LIKELIHOOD is not a global scalar.
        assert_eq!(tpl.render(&d), "<tr><td>[LIKELIHOOD]</td></tr>");
    }

    #[test]
    fn absent_conditional_section_dropped_with_comment() {
        let tpl = Template::parse(
            "<main>\n<!-- cyber -->\n<section id=\"cybersecurity\"><p>[CYBER_SUMMARY]</p></section></main>",
        )
        .unwrap();
        let html = tpl.render(&data());
        assert_eq!(html, "<main>\n</main>");
    }

    #[test]
    fn present_conditional_section_rendered_with_its_values() {
        let mut d = data();
        d.cybersecurity
            .insert("cyber_summary".to_string(), "hardened stack".to_string());
        let tpl = Template::parse(
            "<section id=\"cybersecurity\"><p>[CYBER_SUMMARY] for [ROBOT_MODEL]</p></section>",
        )
        .unwrap();
        assert_eq!(
            tpl.render(&d),
            "<section id=\"cybersecurity\"><p>hardened stack for AMR-7</p></section>"
        );
    }

    #[test]
    fn non_conditional_section_always_rendered() {
        let tpl = Template::parse(
            "<section id=\"introduction\"><p>[COMPANY_NAME]</p></section>",
        )
        .unwrap();
        assert_eq!(
            tpl.render(&data()),
            "<section id=\"introduction\"><p>Acme &amp; Sons</p></section>"
        );
    }

    #[test]
    fn additional_sections_resolve_scalars() {
        let mut d = data();
        d.additional_sections
            .insert("site_address".to_string(), "1 Factory Way".to_string());
        let tpl = Template::parse("<p>[SITE_ADDRESS]</p>").unwrap();
        assert_eq!(tpl.render(&d), "<p>1 Factory Way</p>");
    }
}
