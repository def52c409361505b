//! Template compilation
//!
//! Single forward scan over the HTML. Structure is recognized first
//! (`<section id=...>` blocks and `data-template` elements), then the
//! remaining literal text is tokenized for `[UPPER_SNAKE]` placeholders.
//! Section and repeat matching counts nesting depth on the tag name, so a
//! section inside a section (or a `<div>` row containing inner `<div>`s)
//! closes where its own tag closes.

use crate::error::TemplateError;
use crate::Node;

pub(crate) fn parse_document(html: &str) -> Result<Vec<Node>, TemplateError> {
    parse_blocks(html)
}

fn parse_blocks(input: &str) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    let mut rest = input;

    loop {
        let section = find_section(rest)?;
        let repeat = find_repeat(rest)?;

        // Whichever construct opens first wins; ties go to the section.
        rest = match (section, repeat) {
            (Some(s), Some(r)) if s.block_start <= r.start => take_section(&mut nodes, rest, s)?,
            (Some(s), None) => take_section(&mut nodes, rest, s)?,
            (_, Some(r)) => take_repeat(&mut nodes, rest, r),
            (None, None) => {
                push_inline(&mut nodes, rest);
                return Ok(nodes);
            }
        };
    }
}

fn take_section<'a>(
    nodes: &mut Vec<Node>,
    rest: &'a str,
    s: SectionMatch,
) -> Result<&'a str, TemplateError> {
    push_inline(nodes, &rest[..s.block_start]);
    nodes.push(Node::Section {
        id: s.id,
        open_tag: rest[s.open_start..s.inner_start].to_string(),
        body: parse_blocks(&rest[s.inner_start..s.inner_end])?,
    });
    Ok(&rest[s.block_end..])
}

fn take_repeat<'a>(nodes: &mut Vec<Node>, rest: &'a str, r: RepeatMatch) -> &'a str {
    push_inline(nodes, &rest[..r.start]);
    let mut body = Vec::new();
    push_inline(&mut body, &r.body_html);
    nodes.push(Node::Repeat {
        marker: r.marker,
        body,
    });
    &rest[r.end..]
}

/// Tokenize literal text into `Literal` / `Placeholder` nodes.
fn push_inline(nodes: &mut Vec<Node>, text: &str) {
    let mut literal_start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some(token_len) = placeholder_len(&bytes[i + 1..]) {
                if literal_start < i {
                    nodes.push(Node::Literal(text[literal_start..i].to_string()));
                }
                let token = &text[i + 1..i + 1 + token_len];
                nodes.push(Node::Placeholder(token.to_string()));
                i += token_len + 2;
                literal_start = i;
                continue;
            }
        }
        i += 1;
    }
    if literal_start < text.len() {
        nodes.push(Node::Literal(text[literal_start..].to_string()));
    }
}

/// Length of an `UPPER_SNAKE` token if `rest` starts with `TOKEN]`.
fn placeholder_len(rest: &[u8]) -> Option<usize> {
    let mut len = 0;
    for b in rest {
        match b {
            b'A'..=b'Z' | b'0'..=b'9' | b'_' => len += 1,
            b']' if len > 0 && rest[0].is_ascii_uppercase() => return Some(len),
            _ => return None,
        }
    }
    None
}

struct SectionMatch {
    /// Start of the block, including an absorbed preceding comment.
    block_start: usize,
    /// Start of the `<section` open tag itself.
    open_start: usize,
    id: String,
    inner_start: usize,
    inner_end: usize,
    block_end: usize,
}

fn find_section(input: &str) -> Result<Option<SectionMatch>, TemplateError> {
    let mut from = 0;
    while let Some(rel) = input[from..].find("<section") {
        let open_start = from + rel;
        let after_tag = open_start + "<section".len();
        // Require a real tag boundary, not e.g. "<sectionx".
        if !matches!(input.as_bytes().get(after_tag), Some(b' ' | b'\t' | b'\n' | b'\r' | b'>')) {
            from = after_tag;
            continue;
        }
        let Some(open_end_rel) = input[open_start..].find('>') else {
            // Malformed open tag; nothing past here can parse as a section.
            return Ok(None);
        };
        let open_end = open_start + open_end_rel + 1;
        let open_tag = &input[open_start..open_end];

        let Some(id) = attr_value(open_tag, "id") else {
            // id-less sections stay literal text.
            from = open_end;
            continue;
        };

        let Some((inner_end, block_end)) =
            find_close(input, open_end, "<section", "</section>")
        else {
            return Err(TemplateError::UnclosedSection { id });
        };

        let block_start = absorb_preceding_comment(input, open_start);
        return Ok(Some(SectionMatch {
            block_start,
            open_start,
            id,
            inner_start: open_end,
            inner_end,
            block_end,
        }));
    }
    Ok(None)
}

/// If only whitespace separates a `<!-- ... -->` comment from `at`, return
/// the comment's start; otherwise `at`.
fn absorb_preceding_comment(input: &str, at: usize) -> usize {
    let before = input[..at].trim_end();
    if !before.ends_with("-->") {
        return at;
    }
    match before.rfind("<!--") {
        Some(comment_start) if comment_start + 4 <= before.len() - 3 => comment_start,
        _ => at,
    }
}

/// Find the matching close tag, depth-counting nested opens of the same tag.
/// Returns `(inner_end, block_end)`.
fn find_close(input: &str, from: usize, open: &str, close: &str) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    let mut pos = from;
    loop {
        let next_open = input[pos..].find(open).map(|i| pos + i);
        let next_close = input[pos..].find(close).map(|i| pos + i)?;
        match next_open {
            Some(o) if o < next_close => {
                depth += 1;
                pos = o + open.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some((next_close, next_close + close.len()));
                }
                pos = next_close + close.len();
            }
        }
    }
}

struct RepeatMatch {
    start: usize,
    marker: String,
    /// Full element markup with the `data-template` attribute removed.
    body_html: String,
    end: usize,
}

fn find_repeat(input: &str) -> Result<Option<RepeatMatch>, TemplateError> {
    let Some(attr_at) = input.find("data-template=") else {
        return Ok(None);
    };

    let marker = quoted_value(&input[attr_at + "data-template=".len()..]);
    // The attribute must sit inside an opening tag.
    let tag_start = input[..attr_at]
        .rfind('<')
        .filter(|&lt| !input[lt..attr_at].contains('>'))
        .ok_or_else(|| TemplateError::DanglingRepeatMarker {
            marker: marker.clone(),
        })?;
    let tag: String = input[tag_start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if tag.is_empty() {
        return Err(TemplateError::DanglingRepeatMarker { marker });
    }

    let open_end_rel = input[attr_at..].find('>').ok_or_else(|| {
        TemplateError::UnclosedRepeat {
            marker: marker.clone(),
            tag: tag.clone(),
        }
    })?;
    let open_end = attr_at + open_end_rel + 1;

    let (inner_end, block_end) = if input[..open_end].ends_with("/>") {
        (open_end, open_end)
    } else {
        let open_pat = format!("<{tag}");
        let close_pat = format!("</{tag}>");
        find_close(input, open_end, &open_pat, &close_pat).ok_or_else(|| {
            TemplateError::UnclosedRepeat {
                marker: marker.clone(),
                tag: tag.clone(),
            }
        })?
    };

    // Drop the attribute (and one leading space) from the cloned markup.
    let attr_end = attr_at + "data-template=".len() + quoted_span(&input[attr_at + "data-template=".len()..]);
    let mut body_html = String::new();
    let attr_start = if input[..attr_at].ends_with(' ') {
        attr_at - 1
    } else {
        attr_at
    };
    body_html.push_str(&input[tag_start..attr_start]);
    body_html.push_str(&input[attr_end..inner_end]);
    if block_end > inner_end {
        body_html.push_str(&input[inner_end..block_end]);
    }

    Ok(Some(RepeatMatch {
        start: tag_start,
        marker,
        body_html,
        end: block_end,
    }))
}

/// Value of a quoted (or bare) attribute payload at the start of `rest`.
fn quoted_value(rest: &str) -> String {
    let bytes = rest.as_bytes();
    match bytes.first() {
        Some(&q @ (b'"' | b'\'')) => rest[1..]
            .split(q as char)
            .next()
            .unwrap_or_default()
            .to_string(),
        _ => rest
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
            .collect(),
    }
}

/// Byte length of the attribute payload at the start of `rest`, quotes
/// included.
fn quoted_span(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    match bytes.first() {
        Some(&q @ (b'"' | b'\'')) => match rest[1..].find(q as char) {
            Some(end) => end + 2,
            None => rest.len(),
        },
        _ => quoted_value(rest).len(),
    }
}

/// Extract `name="value"` from an opening tag.
fn attr_value(open_tag: &str, name: &str) -> Option<String> {
    let mut from = 0;
    loop {
        let rel = open_tag[from..].find(name)?;
        let at = from + rel;
        let before_ok = at == 0
            || open_tag.as_bytes()[at - 1].is_ascii_whitespace();
        let rest = &open_tag[at + name.len()..];
        if before_ok && rest.starts_with('=') {
            let value = quoted_value(&rest[1..]);
            if !value.is_empty() {
                return Some(value);
            }
        }
        from = at + name.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_placeholders_tokenized() {
        let mut nodes = Vec::new();
        push_inline(&mut nodes, "<h1>[COMPANY_NAME] — [ROBOT_MODEL]</h1>");
        assert_eq!(
            nodes,
            vec![
                Node::Literal("<h1>".to_string()),
                Node::Placeholder("COMPANY_NAME".to_string()),
                Node::Literal(" — ".to_string()),
                Node::Placeholder("ROBOT_MODEL".to_string()),
                Node::Literal("</h1>".to_string()),
            ]
        );
    }

    #[test]
    fn lowercase_brackets_stay_literal() {
        let mut nodes = Vec::new();
        push_inline(&mut nodes, "array[0] and [not_a_token]");
        assert_eq!(
            nodes,
            vec![Node::Literal("array[0] and [not_a_token]".to_string())]
        );
    }

    #[test]
    fn section_with_id_becomes_node() {
        let html = r#"<p>x</p><section id="cybersecurity"><h2>[CYBER_TITLE]</h2></section><p>y</p>"#;
        let nodes = parse_document(html).unwrap();
        assert!(matches!(
            &nodes[1],
            Node::Section { id, .. } if id == "cybersecurity"
        ));
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn preceding_comment_absorbed_into_section() {
        let html = "a\n<!-- cybersecurity block -->\n<section id=\"cybersecurity\">b</section>c";
        let nodes = parse_document(html).unwrap();
        assert_eq!(nodes[0], Node::Literal("a\n".to_string()));
        assert!(matches!(&nodes[1], Node::Section { .. }));
        assert_eq!(nodes[2], Node::Literal("c".to_string()));
    }

    #[test]
    fn nested_sections_close_at_matching_depth() {
        let html = r#"<section id="maintenance-safety"><section><p>inner</p></section></section>"#;
        let nodes = parse_document(html).unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::Section { id, body, .. } = &nodes[0] else {
            panic!("expected section");
        };
        assert_eq!(id, "maintenance-safety");
        assert_eq!(
            body,
            &vec![Node::Literal("<section><p>inner</p></section>".to_string())]
        );
    }

    #[test]
    fn idless_section_stays_literal() {
        let html = "<section class=\"hero\"><p>[COMPANY_NAME]</p></section>";
        let nodes = parse_document(html).unwrap();
        assert!(nodes.iter().all(|n| !matches!(n, Node::Section { .. })));
        assert!(nodes.contains(&Node::Placeholder("COMPANY_NAME".to_string())));
    }

    #[test]
    fn repeat_row_extracted_and_attribute_stripped() {
        let html = "<table><tr data-template=\"risk-row\"><td>[HAZARD]</td></tr></table>";
        let nodes = parse_document(html).unwrap();
        let Node::Repeat { marker, body } = &nodes[1] else {
            panic!("expected repeat, got {nodes:?}");
        };
        assert_eq!(marker, "risk-row");
        assert_eq!(
            body,
            &vec![
                Node::Literal("<tr><td>".to_string()),
                Node::Placeholder("HAZARD".to_string()),
                Node::Literal("</td></tr>".to_string()),
            ]
        );
    }

    #[test]
    fn repeat_inside_section_parses() {
        let html = "<section id=\"cybersecurity\"><ul><li data-template=\"risk-row\">[HAZARD]</li></ul></section>";
        let nodes = parse_document(html).unwrap();
        let Node::Section { body, .. } = &nodes[0] else {
            panic!("expected section");
        };
        assert!(body.iter().any(|n| matches!(n, Node::Repeat { .. })));
    }

    #[test]
    fn unclosed_section_is_an_error() {
        let err = parse_document("<section id=\"cybersecurity\">oops").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedSection { id } if id == "cybersecurity"));
    }

    #[test]
    fn unclosed_repeat_is_an_error() {
        let err = parse_document("<tr data-template=\"risk-row\"><td>x</td>").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedRepeat { .. }));
    }

    #[test]
    fn section_and_repeat_parse_in_document_order() {
        let html = concat!(
            "<section id=\"cybersecurity\"><p>a</p></section>",
            "<tr data-template=\"risk-row\"><td>[HAZARD]</td></tr>",
        );
        let nodes = parse_document(html).unwrap();
        assert!(matches!(&nodes[0], Node::Section { .. }));
        assert!(matches!(&nodes[1], Node::Repeat { .. }));

        let flipped = concat!(
            "<tr data-template=\"risk-row\"><td>[HAZARD]</td></tr>",
            "<section id=\"cybersecurity\"><p>a</p></section>",
        );
        let nodes = parse_document(flipped).unwrap();
        assert!(matches!(&nodes[0], Node::Repeat { .. }));
        assert!(matches!(&nodes[1], Node::Section { .. }));
    }

    #[test]
    fn nested_rows_of_same_tag_depth_counted() {
        let html = "<div data-template=\"risk-row\"><div>[HAZARD]</div></div><p>after</p>";
        let nodes = parse_document(html).unwrap();
        let Node::Repeat { body, .. } = &nodes[0] else {
            panic!("expected repeat");
        };
        assert_eq!(body[0], Node::Literal("<div><div>".to_string()));
        assert_eq!(nodes[1], Node::Literal("<p>after</p>".to_string()));
    }

    proptest::proptest! {
        // No markup constructs and no matching data: rendering must give
        // the input back verbatim, unresolved tokens included.
        #[test]
        fn plain_text_round_trips(text in "[A-Za-z0-9 \\[\\]_.,-]{0,64}") {
            let template = crate::Template::parse(&text).unwrap();
            let rendered = template.render(&caseflow_model::SafetyCaseData::default());
            proptest::prop_assert_eq!(rendered, text);
        }
    }
}
