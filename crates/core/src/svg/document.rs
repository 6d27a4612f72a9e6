//! Owned, mutable SVG document tree.
//!
//! Markup is read with `quick-xml` into plain owned nodes so the binding
//! applier can mutate it freely. Qualified names are kept verbatim (no
//! namespace processing) and serialization is deterministic: attributes keep
//! their stored order and childless elements self-close.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::CoreError;

/// Child-index path from the root element. The root itself is `[]`.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Case-insensitive tag comparison.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Overwrite an existing attribute in place, or append a new one.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Drop every child and insert a single text node.
    pub fn replace_children_with_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.children.push(Node::Text(text.into()));
    }

    /// Concatenated text of all descendant text and CDATA nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    fn child_element(&self, index: usize) -> Option<&Element> {
        match self.children.get(index) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn child_element_mut(&mut self, index: usize) -> Option<&mut Element> {
        match self.children.get_mut(index) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            Node::Element(inner) => collect_text(inner, out),
            Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        }
    }
}

/// A parsed SVG document: the root element plus any comments or processing
/// instructions that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
    trailing: Vec<Node>,
}

impl Document {
    /// Parse markup whose root element must be `<svg>`.
    ///
    /// Callers are expected to run [`super::sanitize`] first; this only
    /// enforces well-formedness.
    pub fn parse(markup: &str) -> Result<Self, CoreError> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().check_end_names = true;

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut trailing: Vec<Node> = Vec::new();

        loop {
            let event = reader.read_event().map_err(map_xml_error)?;
            match event {
                Event::Start(start) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(malformed("more than one root element"));
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let el = element_from_start(&start)?;
                    attach_element(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| malformed("closing tag without an open element"))?;
                    attach_element(&mut stack, &mut root, el)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(map_xml_error)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => return Err(malformed("text outside of the root element")),
                    }
                }
                Event::CData(data) => {
                    let data = String::from_utf8_lossy(&data).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::CData(data)),
                        None => return Err(malformed("CDATA outside of the root element")),
                    }
                }
                Event::Comment(comment) => {
                    let comment = Node::Comment(String::from_utf8_lossy(&comment).into_owned());
                    push_misc(&mut stack, root.is_some(), &mut trailing, comment);
                }
                Event::PI(pi) => {
                    let pi =
                        Node::ProcessingInstruction(String::from_utf8_lossy(&pi).into_owned());
                    push_misc(&mut stack, root.is_some(), &mut trailing, pi);
                }
                Event::Decl(_) => {
                    return Err(malformed("unexpected XML declaration"));
                }
                Event::DocType(_) => {
                    return Err(CoreError::InvalidSvg(
                        "SVG DOCTYPE is not allowed.".to_string(),
                    ));
                }
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            return Err(malformed(&format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| malformed("no root element"))?;
        if !root.has_tag("svg") {
            return Err(CoreError::InvalidSvg("Invalid SVG root element.".to_string()));
        }

        Ok(Self { root, trailing })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Resolve a path to an element, or `None` if it no longer exists.
    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for &index in path {
            current = current.child_element(index)?;
        }
        Some(current)
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for &index in path {
            current = current.child_element_mut(index)?;
        }
        Some(current)
    }

    /// First element in document order (root included) whose `id` equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodePath> {
        if self.root.attribute("id") == Some(id) {
            return Some(Vec::new());
        }
        let mut found = None;
        walk_descendants(&self.root, &mut Vec::new(), &mut |path: &[usize], el: &Element| {
            if found.is_none() && el.attribute("id") == Some(id) {
                found = Some(path.to_vec());
            }
        });
        found
    }

    /// Paths of every descendant element of `base` (excluding `base`) that
    /// satisfies `predicate`, in document order.
    pub fn descendants_matching<F>(&self, base: &[usize], predicate: F) -> Vec<NodePath>
    where
        F: Fn(&Element) -> bool,
    {
        let Some(start) = self.element(base) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut path = base.to_vec();
        walk_descendants(start, &mut path, &mut |p: &[usize], el: &Element| {
            if predicate(el) {
                out.push(p.to_vec());
            }
        });
        out
    }

    /// Serialize back to markup, without an XML declaration.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, &self.root);
        for node in &self.trailing {
            write_node(&mut out, node);
        }
        out
    }
}

fn walk_descendants<F>(el: &Element, path: &mut Vec<usize>, visit: &mut F)
where
    F: FnMut(&[usize], &Element),
{
    for (index, child) in el.children.iter().enumerate() {
        if let Node::Element(child_el) = child {
            path.push(index);
            visit(path, child_el);
            walk_descendants(child_el, path, visit);
            path.pop();
        }
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, CoreError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(&format!("bad attribute on <{}>: {e}", el.name)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(map_xml_error)?.into_owned();
        el.attributes.push(Attribute { name: key, value });
    }
    Ok(el)
}

fn attach_element(
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
) -> Result<(), CoreError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None if root.is_some() => return Err(malformed("more than one root element")),
        None => *root = Some(el),
    }
    Ok(())
}

fn push_misc(stack: &mut [Element], root_closed: bool, trailing: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root_closed => trailing.push(node),
        // Leading comments are stripped during sanitization.
        None => {}
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(el) => write_element(out, el),
        Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
        Node::CData(data) => {
            out.push_str("<![CDATA[");
            out.push_str(data);
            out.push_str("]]>");
        }
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(pi) => {
            out.push_str("<?");
            out.push_str(pi);
            out.push_str("?>");
        }
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &el.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

fn malformed(detail: &str) -> CoreError {
    CoreError::InvalidSvg(format!("SVG could not be parsed: {detail}"))
}

fn map_xml_error(err: quick_xml::Error) -> CoreError {
    match err {
        quick_xml::Error::Io(io) => CoreError::Internal(format!("XML reader I/O failure: {io}")),
        other => malformed(&other.to_string()),
    }
}
