//! Output markup tree and its serialization.
//!
//! The converter builds a small element tree rather than writing text
//! directly, so tables can be assembled out of order (the column group and
//! header are only known after every row was visited). Serialization goes
//! through `quick-xml`'s writer, which handles attribute and text escaping.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::Result;

/// Elements serialized as `<name/>` with no closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "col", "img", "meta"];

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Element(el) => el.text_content(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

/// One markup element with ordered attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: &'static str,
    attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    #[must_use]
    pub fn with_attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> &[(&'static str, String)] {
        &self.attrs
    }

    /// Append declarations to the inline `style` attribute.
    pub fn append_style(&mut self, css: &str) {
        match self.attrs.iter_mut().find(|(n, _)| *n == "style") {
            Some((_, existing)) => existing.push_str(css),
            None => self.attrs.push(("style", css.to_string())),
        }
    }

    /// Add a class name to the space-separated `class` attribute.
    pub fn add_class(&mut self, class: &str) {
        match self.attrs.iter_mut().find(|(n, _)| *n == "class") {
            Some((_, existing)) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(class);
            }
            Some((_, existing)) => existing.push_str(class),
            None => self.attrs.push(("class", class.to_string())),
        }
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Builder form of [`Element::push`].
    #[must_use]
    pub fn with_child(mut self, node: impl Into<Node>) -> Self {
        self.push(node);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    /// Direct child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter_map(Node::as_element)
            .filter(move |el| el.name == name)
    }

    /// Every descendant element with the given name, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_named(&self.children, name, &mut found);
        found
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name);
        for (name, value) in &self.attrs {
            start.push_attribute((*name, value.as_str()));
        }
        if VOID_ELEMENTS.contains(&self.name) {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        write_nodes(writer, &self.children)?;
        writer.write_event(Event::End(BytesEnd::new(self.name)))?;
        Ok(())
    }
}

fn collect_named<'a>(nodes: &'a [Node], name: &str, found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.name == name {
                found.push(el);
            }
            collect_named(&el.children, name, found);
        }
    }
}

fn write_nodes<W: Write>(writer: &mut Writer<W>, nodes: &[Node]) -> Result<()> {
    for node in nodes {
        match node {
            Node::Element(el) => el.write_to(writer)?,
            Node::Text(text) if text.is_empty() => {}
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    Ok(())
}

// ── Document ──────────────────────────────────────────────────────

/// A complete output document: head metadata, one stylesheet, body content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlDocument {
    pub title: Option<String>,
    /// `<meta name=.. content=..>` pairs, in insertion order.
    pub meta: Vec<(String, String)>,
    /// Stylesheet text placed in the head.
    pub stylesheet: String,
    /// Class of the `<body>` element.
    pub body_class: Option<String>,
    pub body: Vec<Node>,
}

impl HtmlDocument {
    pub fn add_meta(&mut self, name: &str, content: &str) {
        self.meta.push((name.to_string(), content.to_string()));
    }

    /// Every `<table>` in the body, in document order.
    pub fn tables(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_named(&self.body, "table", &mut found);
        found
    }

    /// Serialize the whole document.
    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::new(out);
        writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
        writer.write_event(Event::Start(BytesStart::new("html")))?;

        writer.write_event(Event::Start(BytesStart::new("head")))?;
        Element::new("meta")
            .with_attr("http-equiv", "Content-Type")
            .with_attr("content", "text/html; charset=utf-8")
            .write_to(&mut writer)?;
        if let Some(title) = &self.title {
            Element::new("title").with_text(title.as_str()).write_to(&mut writer)?;
        }
        for (name, content) in &self.meta {
            Element::new("meta")
                .with_attr("name", name.as_str())
                .with_attr("content", content.as_str())
                .write_to(&mut writer)?;
        }
        let mut style = BytesStart::new("style");
        style.push_attribute(("type", "text/css"));
        writer.write_event(Event::Start(style))?;
        // Style is a raw-text element: entities would not be decoded.
        let css = self.stylesheet.replace("</", "<\\/");
        writer.write_event(Event::Text(BytesText::from_escaped(css)))?;
        writer.write_event(Event::End(BytesEnd::new("style")))?;
        writer.write_event(Event::End(BytesEnd::new("head")))?;

        let mut body = BytesStart::new("body");
        if let Some(class) = &self.body_class {
            body.push_attribute(("class", class.as_str()));
        }
        writer.write_event(Event::Start(body))?;
        write_nodes(&mut writer, &self.body)?;
        writer.write_event(Event::End(BytesEnd::new("body")))?;

        writer.write_event(Event::End(BytesEnd::new("html")))?;
        Ok(())
    }

    /// Serialize to a string.
    pub fn to_html(&self) -> Result<String> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(el: &Element) -> String {
        let mut writer = Writer::new(Vec::new());
        el.write_to(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    // ── Element ──────────────────────────────────────────────────

    #[test]
    fn set_attr_replaces() {
        let mut td = Element::new("td").with_attr("width", "10");
        td.set_attr("width", "20");
        assert_eq!(td.attr("width"), Some("20"));
        assert_eq!(td.attrs().len(), 1);
    }

    #[test]
    fn append_style_and_class() {
        let mut td = Element::new("td");
        td.append_style("padding: 0px;");
        td.append_style("position:relative;");
        td.add_class("c2");
        td.add_class("c1");
        assert_eq!(td.attr("style"), Some("padding: 0px;position:relative;"));
        assert_eq!(td.attr("class"), Some("c2 c1"));
    }

    #[test]
    fn descendants_in_order() {
        let table = Element::new("table").with_child(
            Element::new("tbody")
                .with_child(Element::new("tr").with_child(Element::new("td").with_text("a")))
                .with_child(Element::new("tr").with_child(Element::new("td").with_text("b"))),
        );
        let cells: Vec<String> = table
            .descendants_named("td")
            .iter()
            .map(|td| td.text_content())
            .collect();
        assert_eq!(cells, ["a", "b"]);
    }

    // ── Serialization ────────────────────────────────────────────

    #[test]
    fn empty_element_keeps_close_tag() {
        assert_eq!(serialize(&Element::new("td")), "<td></td>");
    }

    #[test]
    fn void_element_self_closes() {
        let col = Element::new("col").with_attr("width", "64");
        assert_eq!(serialize(&col), r#"<col width="64"/>"#);
    }

    #[test]
    fn text_and_attrs_escaped() {
        let td = Element::new("td")
            .with_attr("title", "a\"b")
            .with_text("1 < 2 & 3");
        assert_eq!(serialize(&td), r#"<td title="a&quot;b">1 &lt; 2 &amp; 3</td>"#);
    }

    #[test]
    fn document_structure() {
        let mut doc = HtmlDocument {
            title: Some("Report".into()),
            stylesheet: ".c1{font-family: 'Arial', sans-serif}\n".into(),
            body_class: Some("b1".into()),
            ..HtmlDocument::default()
        };
        doc.add_meta("author", "Jane");
        doc.body.push(Element::new("h2").with_text("Sheet1").into());
        let html = doc.to_html().unwrap();
        assert!(html.starts_with("<!DOCTYPE html><html><head>"));
        assert!(html.contains("<title>Report</title>"));
        assert!(html.contains(r#"<meta name="author" content="Jane"/>"#));
        // quotes inside the stylesheet stay literal
        assert!(html.contains(".c1{font-family: 'Arial', sans-serif}"));
        assert!(html.contains(r#"<body class="b1"><h2>Sheet1</h2></body></html>"#));
    }
}
