//! Just enough XML for the dump dialect.
//!
//! The dump grammar is a fixed, flat tree of known elements with quoted
//! attributes and text content; nothing in the pack warrants a full XML
//! dependency for it. Entity handling covers the five predefined entities.

use std::fmt::Write as _;

/// Parsed element: attributes, child elements, and direct text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn first_child<'a>(&'a self, name: &'a str) -> Option<&'a Element> {
        self.children_named(name).next()
    }
}

pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape(value: &str) -> Result<String, String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let end = rest
            .find(';')
            .ok_or_else(|| format!("unterminated entity near '{}'", head(rest)))?;
        let entity = &rest[1..end];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            other => return Err(format!("unknown entity '&{other};'")),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn head(value: &str) -> String {
    value.chars().take(20).collect()
}

/// Render an element tree with two-space indentation and LF endings.
pub fn render(element: &Element) -> String {
    let mut out = String::new();
    render_into(element, 0, &mut out);
    out
}

fn render_into(element: &Element, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}<{}", element.name);
    for (key, value) in &element.attrs {
        let _ = write!(out, " {key}=\"{}\"", escape_attr(value));
    }

    if element.children.is_empty() && element.text.is_empty() {
        out.push_str("/>\n");
        return;
    }

    if element.children.is_empty() {
        let _ = write!(out, ">{}</{}>\n", escape_text(&element.text), element.name);
        return;
    }

    out.push_str(">\n");
    for child in &element.children {
        render_into(child, depth + 1, out);
    }
    let _ = write!(out, "{indent}</{}>\n", element.name);
}

/// Parse a document into its root element.
pub fn parse(input: &str) -> Result<Element, String> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };
    parser.skip_prolog();
    let root = parser.parse_element()?;
    Ok(root)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn skip_prolog(&mut self) {
        self.skip_whitespace();
        if self.rest().starts_with("<?") {
            if let Some(end) = self.rest().find("?>") {
                self.pos += end + 2;
            }
        }
        self.skip_whitespace();
    }

    fn rest(&self) -> &'a str {
        // Positions always land on char boundaries: we only advance past
        // ASCII delimiters or whole scanned segments.
        std::str::from_utf8(&self.bytes[self.pos..]).unwrap_or("")
    }

    fn expect(&mut self, token: &str) -> Result<(), String> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(format!("expected '{token}' near '{}'", head(self.rest())))
        }
    }

    fn scan_name(&mut self) -> Result<String, String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(format!("expected a name near '{}'", head(rest)));
        }
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn parse_element(&mut self) -> Result<Element, String> {
        self.expect("<")?;
        let name = self.scan_name()?;
        let mut element = Element {
            name,
            ..Element::default()
        };

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }

            let key = self.scan_name()?;
            self.expect("=")?;
            self.expect("\"")?;
            let rest = self.rest();
            let end = rest
                .find('"')
                .ok_or_else(|| format!("unterminated attribute value for '{key}'"))?;
            let value = unescape(&rest[..end])?;
            self.pos += end + 1;
            element.attrs.push((key, value));
        }

        // Content: children and/or text until the matching close tag.
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(format!("unexpected end of input inside <{}>", element.name));
            }

            if let Some(stripped) = rest.strip_prefix("</") {
                let close = format!("{}>", element.name);
                if !stripped.starts_with(&close) {
                    return Err(format!(
                        "mismatched close tag near '</{}'",
                        head(stripped)
                    ));
                }
                self.pos += 2 + close.len();
                return Ok(element);
            }

            if rest.starts_with('<') {
                let child = self.parse_element()?;
                element.children.push(child);
                continue;
            }

            let end = rest.find('<').unwrap_or(rest.len());
            let segment = unescape(&rest[..end])?;
            // Whitespace between child elements is layout, not content.
            if element.children.is_empty() || !segment.trim().is_empty() {
                element.text.push_str(&segment);
            }
            self.pos += end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_attrs_text_and_nesting() {
        let doc = "<dump session=\"abc-123\">\n  <model>gemini-flash</model>\n  <stack>\n    <file path=\"/tmp/a &amp; b.txt\"/>\n  </stack>\n</dump>\n";
        let root = parse(doc).expect("parse");

        assert_eq!(root.name, "dump");
        assert_eq!(root.attr("session"), Some("abc-123"));
        assert_eq!(
            root.first_child("model").expect("model child").text,
            "gemini-flash"
        );
        let stack = root.first_child("stack").expect("stack child");
        let file = stack.first_child("file").expect("file child");
        assert_eq!(file.attr("path"), Some("/tmp/a & b.txt"));
    }

    #[test]
    fn render_escapes_entities_both_ways() {
        let element = Element {
            name: "elem".to_string(),
            attrs: vec![("role".to_string(), "a\"b<c".to_string())],
            children: Vec::new(),
            text: "x < y & z".to_string(),
        };

        let rendered = render(&element);
        assert_eq!(
            rendered,
            "<elem role=\"a&quot;b&lt;c\">x &lt; y &amp; z</elem>\n"
        );

        let reparsed = parse(&rendered).expect("reparse");
        assert_eq!(reparsed.attr("role"), Some("a\"b<c"));
        assert_eq!(reparsed.text, "x < y & z");
    }

    #[test]
    fn prolog_is_skipped() {
        let doc = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<dump></dump>";
        let root = parse(doc).expect("parse");
        assert_eq!(root.name, "dump");
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let error = parse("<a>&bogus;</a>").expect_err("unknown entity must fail");
        assert!(error.contains("unknown entity"));
    }

    #[test]
    fn self_closing_elements_parse_empty() {
        let root = parse("<stack><file path=\"/p\"/><file path=\"/q\"/></stack>").expect("parse");
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().all(|child| child.text.is_empty()));
    }
}
