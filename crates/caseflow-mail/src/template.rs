//! `{{name}}` substitution for plain-text mail bodies.

use std::collections::BTreeMap;

/// Replace `{{name}}` tokens with values from `vars`.
///
/// Unknown tokens are left in place so a half-filled template is visible
/// in the delivered mail rather than silently blanked.
#[must_use]
pub fn render_mail_template(text: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let name = after[..close].trim();
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[open..open + 2 + close + 2]),
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}
