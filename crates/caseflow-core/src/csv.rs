//! CSV parsing for lead import
//!
//! Line-oriented RFC 4180 subset: quoted fields with embedded commas,
//! newlines and doubled quotes, CRLF or LF records. The header row is
//! matched against tolerant alias lists, so marketing exports with
//! "E-mail" or "Organisation" columns import without preprocessing. Rows
//! without a plausible email are dropped here; de-duplication happens in
//! the lead manager.

/// One parsed import row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadCsvRow {
    pub name: String,
    pub company: String,
    pub email: String,
    pub website: Option<String>,
    pub selection_reason: Option<String>,
}

const NAME_ALIASES: &[&str] = &["name", "full name", "contact", "contact name"];
const COMPANY_ALIASES: &[&str] = &["company", "company name", "organization", "organisation"];
const EMAIL_ALIASES: &[&str] = &["email", "e-mail", "email address", "contact email"];
const WEBSITE_ALIASES: &[&str] = &["website", "url", "web", "site"];
const REASON_ALIASES: &[&str] = &["selection reason", "reason", "why selected", "notes"];

/// Parse raw CSV text into import rows.
///
/// Returns an empty vec for empty input or a header-only file. Unknown
/// columns are ignored; missing name/company fall back to empty strings.
#[must_use]
pub fn parse_lead_csv(text: &str) -> Vec<LeadCsvRow> {
    let mut records = parse_records(text).into_iter();
    let Some(header) = records.next() else {
        return Vec::new();
    };

    let header: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    let col = |aliases: &[&str]| -> Option<usize> {
        header
            .iter()
            .position(|h| aliases.contains(&h.as_str()))
    };
    let name_col = col(NAME_ALIASES);
    let company_col = col(COMPANY_ALIASES);
    let email_col = col(EMAIL_ALIASES);
    let website_col = col(WEBSITE_ALIASES);
    let reason_col = col(REASON_ALIASES);

    let field = |record: &[String], idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    records
        .filter_map(|record| {
            let email = field(&record, email_col);
            if !email.contains('@') || email.len() < 3 {
                return None;
            }
            let website = Some(field(&record, website_col)).filter(|s| !s.is_empty());
            let selection_reason =
                Some(field(&record, reason_col)).filter(|s| !s.is_empty());
            Some(LeadCsvRow {
                name: field(&record, name_col),
                company: field(&record, company_col),
                email,
                website,
                selection_reason,
            })
        })
        .collect()
}

/// Split CSV text into records of fields.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                }
                record.clear();
            }
            _ => field.push(c),
        }
    }
    // Final record without a trailing newline.
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        if !(record.len() == 1 && record[0].is_empty()) {
            records.push(record);
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_rows_parse() {
        let rows = parse_lead_csv(
            "Name,Company,Email\nJane Doe,Acme,jane@acme.com\nBo Li,Beta,bo@beta.io\n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Jane Doe");
        assert_eq!(rows[1].email, "bo@beta.io");
    }

    #[test]
    fn quoted_fields_with_commas_and_quotes() {
        let rows = parse_lead_csv(
            "name,company,email\n\"Doe, Jane\",\"Acme \"\"Robotics\"\"\",jane@acme.com\n",
        );
        assert_eq!(rows[0].name, "Doe, Jane");
        assert_eq!(rows[0].company, "Acme \"Robotics\"");
    }

    #[test]
    fn quoted_field_with_embedded_newline() {
        let rows = parse_lead_csv(
            "name,email,notes\nJane,jane@acme.com,\"line one\nline two\"\n",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].selection_reason.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn header_aliases_and_crlf() {
        let rows = parse_lead_csv(
            "Full Name,Organisation,E-mail,URL\r\nJane,Acme,jane@acme.com,https://acme.com\r\n",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company, "Acme");
        assert_eq!(rows[0].website.as_deref(), Some("https://acme.com"));
    }

    #[test]
    fn rows_without_email_dropped() {
        let rows = parse_lead_csv("name,email\nNo Email,\nBad,not-an-email\nOk,a@b.co\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].email, "a@b.co");
    }

    #[test]
    fn empty_and_header_only_inputs() {
        assert!(parse_lead_csv("").is_empty());
        assert!(parse_lead_csv("name,email\n").is_empty());
        assert!(parse_lead_csv("\n\n").is_empty());
    }

    #[test]
    fn bom_on_first_header_cell() {
        let rows = parse_lead_csv("\u{feff}email,name\njane@acme.com,Jane\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Jane");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Unquoted simple fields survive a format/parse round-trip.
            #[test]
            fn simple_fields_round_trip(
                names in proptest::collection::vec("[a-z][a-z ]{0,8}[a-z]", 1..8)
            ) {
                let mut text = String::from("name,email\n");
                for name in &names {
                    text.push_str(name);
                    text.push_str(",x@y.io\n");
                }
                let rows = parse_lead_csv(&text);
                prop_assert_eq!(rows.len(), names.len());
                for (row, name) in rows.iter().zip(&names) {
                    prop_assert_eq!(&row.name, name);
                }
            }

            // Arbitrary content is safe behind quoting.
            #[test]
            fn quoted_content_round_trips(content in "[ -~]{0,20}") {
                let quoted = format!("\"{}\"", content.replace('"', "\"\""));
                let text = format!("name,email\n{quoted},x@y.io\n");
                let rows = parse_lead_csv(&text);
                prop_assert_eq!(rows.len(), 1);
                prop_assert_eq!(&rows[0].name, content.trim());
            }
        }
    }
}
