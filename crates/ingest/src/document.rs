use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::Html;

use crate::error::{ExtractError, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Strict tagged data (XML).
    Tagged,
    /// Loosely structured presentation markup (HTML).
    Presentation,
}

/// A fetched resource after parsing, one variant per parser family.
#[derive(Debug)]
pub enum ParsedDocument {
    Tagged(XmlElement),
    Presentation(Html),
}

impl ParsedDocument {
    pub fn parse(kind: DocumentKind, raw: &str) -> Result<Self, ParseError> {
        match kind {
            DocumentKind::Tagged => XmlElement::parse(raw).map(ParsedDocument::Tagged),
            DocumentKind::Presentation => Ok(ParsedDocument::Presentation(Html::parse_document(raw))),
        }
    }

    pub fn as_tagged(&self) -> Result<&XmlElement, ExtractError> {
        match self {
            ParsedDocument::Tagged(root) => Ok(root),
            ParsedDocument::Presentation(_) => Err(ExtractError::UnexpectedDocument(DocumentKind::Tagged)),
        }
    }

    pub fn as_presentation(&self) -> Result<&Html, ExtractError> {
        match self {
            ParsedDocument::Presentation(html) => Ok(html),
            ParsedDocument::Tagged(_) => {
                Err(ExtractError::UnexpectedDocument(DocumentKind::Presentation))
            }
        }
    }
}

/// Element of a navigable XML tree. Attributes are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(start: &BytesStart<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).to_string(),
            ..Self::default()
        }
    }

    /// Build a tree from a complete XML document.
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(XmlElement::new(&e)),
                Event::Empty(e) => attach(&mut stack, &mut root, XmlElement::new(&e))?,
                Event::End(e) => {
                    let element = stack.pop().ok_or_else(|| {
                        ParseError::Unmatched(String::from_utf8_lossy(e.name().as_ref()).to_string())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(e) => {
                    if let Some(current) = stack.last_mut() {
                        let text = e.unescape().map_err(quick_xml::Error::from)?;
                        current.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(ParseError::Unclosed(open.name));
        }
        root.ok_or(ParseError::NoRoot)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// First direct child with the given tag name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given tag name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    match root {
        Some(existing) => Err(ParseError::TrailingContent(existing.name.clone())),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}
