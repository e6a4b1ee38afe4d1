//! Reading and writing rendered pages.
//!
//! The reader is deliberately lenient: rendered tutorial pages come out of a
//! static site generator and are trusted to be mostly well formed, so there is
//! no error path. Unmatched end tags are dropped and anything still open at
//! the end of input is closed implicitly.

use crate::document::{Document, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Parse an HTML page into a [`Document`].
pub fn parse(input: &str) -> Document {
    Parser::new(input).run()
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
    doc: Document,
    open: Vec<NodeId>,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Self {
        let doc = Document::new();
        let root = doc.root();
        Self {
            src,
            pos: 0,
            doc,
            open: vec![root],
        }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn current(&self) -> NodeId {
        // The root is never popped.
        self.open[self.open.len() - 1]
    }

    fn run(mut self) -> Document {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.declaration();
            } else if rest.starts_with("</") {
                self.end_tag();
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.start_tag();
            } else {
                self.text();
            }
        }
        self.doc
    }

    fn push_text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let node = self.doc.create_text(&decode_entities(raw));
        let parent = self.current();
        self.doc.append_child(parent, node);
    }

    fn text(&mut self) {
        let rest = self.rest();
        // Skip the first byte: a lone '<' that did not open a tag is text.
        let len = rest.as_bytes()[1..]
            .iter()
            .position(|b| *b == b'<')
            .map_or(rest.len(), |i| i + 1);
        self.pos += len;
        self.push_text(&rest[..len]);
    }

    fn comment(&mut self) {
        let body_start = self.pos + 4;
        let (body, next) = match self.src[body_start..].find("-->") {
            Some(i) => (&self.src[body_start..body_start + i], body_start + i + 3),
            None => (&self.src[body_start..], self.src.len()),
        };
        let node = self.doc.create_comment(body);
        let parent = self.current();
        self.doc.append_child(parent, node);
        self.pos = next;
    }

    fn declaration(&mut self) {
        let body_start = self.pos + 2;
        let (body, next) = match self.src[body_start..].find('>') {
            Some(i) => (&self.src[body_start..body_start + i], body_start + i + 1),
            None => (&self.src[body_start..], self.src.len()),
        };
        let node = if self.src[self.pos..].starts_with("<!") {
            self.doc.create_doctype(body)
        } else {
            self.doc.create_comment(&format!("?{body}"))
        };
        let parent = self.current();
        self.doc.append_child(parent, node);
        self.pos = next;
    }

    fn end_tag(&mut self) {
        let body_start = self.pos + 2;
        let close = self.src[body_start..]
            .find('>')
            .map_or(self.src.len(), |i| body_start + i);
        let name = self.src[body_start..close].trim().to_ascii_lowercase();
        self.pos = (close + 1).min(self.src.len());
        let depth = self
            .open
            .iter()
            .rposition(|id| self.doc.tag(*id) == Some(name.as_str()));
        if let Some(depth) = depth {
            self.open.truncate(depth);
        }
    }

    fn start_tag(&mut self) {
        let bytes = self.src.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'>' | b'/')
        {
            i += 1;
        }
        let tag = self.src[self.pos + 1..i].to_ascii_lowercase();
        let element = self.doc.create_element(&tag);
        let mut self_closing = false;

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    self_closing = true;
                    i += 1;
                }
                _ => {
                    let name_start = i;
                    while i < bytes.len()
                        && !bytes[i].is_ascii_whitespace()
                        && !matches!(bytes[i], b'=' | b'>' | b'/')
                    {
                        i += 1;
                    }
                    let name = &self.src[name_start..i];
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    let mut value = String::new();
                    if i < bytes.len() && bytes[i] == b'=' {
                        i += 1;
                        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                            i += 1;
                        }
                        let (raw, next) = attr_value(self.src, i);
                        value = decode_entities(raw);
                        i = next;
                    }
                    // First occurrence wins.
                    if self.doc.attr(element, name).is_none() {
                        self.doc.set_attr(element, name, &value);
                    }
                    self_closing = false;
                }
            }
        }
        self.pos = i.min(self.src.len());

        let parent = self.current();
        self.doc.append_child(parent, element);
        if self_closing || is_void(&tag) {
            return;
        }
        if is_raw_text(&tag) {
            self.raw_text(element, &tag);
            return;
        }
        self.open.push(element);
    }

    fn raw_text(&mut self, element: NodeId, tag: &str) {
        let rest = self.rest();
        let closing = format!("</{tag}");
        let end = rest
            .to_ascii_lowercase()
            .find(&closing)
            .unwrap_or(rest.len());
        let body = &rest[..end];
        if !body.is_empty() {
            let node = self.doc.create_text(body);
            self.doc.append_child(element, node);
        }
        self.pos += end;
        if self.pos < self.src.len() {
            let close = self.src[self.pos..]
                .find('>')
                .map_or(self.src.len(), |i| self.pos + i + 1);
            self.pos = close;
        }
    }
}

/// Slice out an attribute value starting at `i`; returns it with the index
/// just past it.
fn attr_value(src: &str, i: usize) -> (&str, usize) {
    let bytes = src.as_bytes();
    if i >= bytes.len() {
        return ("", i);
    }
    match bytes[i] {
        quote @ (b'"' | b'\'') => {
            let start = i + 1;
            match src[start..].find(quote as char) {
                Some(len) => (&src[start..start + len], start + len + 1),
                None => (&src[start..], src.len()),
            }
        }
        _ => {
            let mut end = i;
            while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b'>' {
                end += 1;
            }
            (&src[i..end], end)
        }
    }
}

/// Decode the character references rendered pages actually contain.
/// Unknown references are kept literally.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let name = &rest[1..semi];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Write a [`Document`] back out as HTML.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, *child, false, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, raw: bool, out: &mut String) {
    match doc.data(id) {
        NodeData::Root => {
            for child in doc.children(id) {
                write_node(doc, *child, false, out);
            }
        }
        NodeData::Text(text) if raw => out.push_str(text),
        NodeData::Text(text) => escape_text(text, out),
        NodeData::Comment(text) if text.starts_with('?') => {
            out.push('<');
            out.push_str(text);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Doctype(text) => {
            out.push_str("<!");
            out.push_str(text);
            out.push('>');
        }
        NodeData::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if is_void(tag) {
                return;
            }
            let raw_children = is_raw_text(tag);
            for child in doc.children(id) {
                write_node(doc, *child, raw_children, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(doc: &Document, tag: &str) -> NodeId {
        doc.descendants(doc.root())
            .find(|n| doc.tag(*n) == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_parse_nested_code_block() {
        let doc = parse(r#"<div class="highlight"><pre><code>fn main() {}</code></pre></div>"#);
        let div = first_element(&doc, "div");
        let code = first_element(&doc, "code");
        assert!(doc.has_class(div, "highlight"));
        assert_eq!(doc.text_content(code), "fn main() {}");
        assert_eq!(doc.tag(doc.parent(code).unwrap()), Some("pre"));
    }

    #[test]
    fn test_entities_decoded_in_text() {
        let doc = parse("<pre><code>if a &lt; b &amp;&amp; c &gt; d { &#39;x&#x27; }</code></pre>");
        let code = first_element(&doc, "code");
        assert_eq!(doc.text_content(code), "if a < b && c > d { 'x' }");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_entities("a &bogus; b & c"), "a &bogus; b & c");
    }

    #[test]
    fn test_void_and_self_closing() {
        let doc = parse("<p>one<br>two<img src=x.png/>three</p>");
        let p = first_element(&doc, "p");
        assert_eq!(doc.children(p).len(), 5);
        assert_eq!(doc.text_content(p), "onetwothree");
    }

    #[test]
    fn test_script_is_raw() {
        let src = "<script>if (a < b) { x = '</p>'; }</script><p>after &amp; more</p>";
        let doc = parse(src);
        let script = first_element(&doc, "script");
        assert_eq!(doc.text_content(script), "if (a < b) { x = '</p>'; }");
        assert_eq!(serialize(&doc), src);
    }

    #[test]
    fn test_serialize_preserves_structure() {
        let src = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
                   <body><!-- nav --><pre class=\"x\"><code>a &lt;b&gt;\n  c</code></pre></body></html>";
        let doc = parse(src);
        assert_eq!(serialize(&doc), src);
    }

    #[test]
    fn test_repeated_attribute_keeps_first() {
        let doc = parse(r#"<pre class="highlight" class="x"><code>y</code></pre>"#);
        let pre = first_element(&doc, "pre");
        assert!(doc.has_class(pre, "highlight"));
        assert_eq!(serialize(&doc), r#"<pre class="highlight"><code>y</code></pre>"#);
    }

    #[test]
    fn test_br_inside_code_copies_as_newline() {
        let doc = parse("<pre><code>a<br>b</code></pre>");
        assert_eq!(doc.text_content(first_element(&doc, "code")), "a\nb");
    }

    #[test]
    fn test_unmatched_end_tag_ignored() {
        let doc = parse("<div></span><p>x</div>");
        let p = first_element(&doc, "p");
        let div = first_element(&doc, "div");
        assert_eq!(doc.parent(p), Some(div));
        assert_eq!(serialize(&doc), "<div><p>x</p></div>");
    }
}
