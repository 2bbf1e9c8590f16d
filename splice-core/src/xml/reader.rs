//! Streaming XML Cursor
//!
//! A thin cursor over `quick_xml::Reader` with the traversal primitives the
//! project loader is written against. The typical loop is
//!
//! ```rust,ignore
//! while cursor.read_next_start_element()? {
//!     match cursor.name() {
//!         "param" => read_param(&mut cursor)?,
//!         _ => cursor.skip_current_element()?,
//!     }
//! }
//! ```
//!
//! where each handler consumes its element up to and including the end tag.

use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::XmlError;

/// Forward-only cursor over an XML document held in memory.
pub struct XmlCursor<'a> {
    reader: Reader<&'a [u8]>,

    /// Name of the element most recently entered.
    name: String,

    /// Attributes of that element, unescaped, in document order.
    attributes: Vec<(String, String)>,
}

impl<'a> XmlCursor<'a> {
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        // `<a/>` is reported as a start tag followed by an end tag.
        reader.config_mut().expand_empty_elements = true;

        Self {
            reader,
            name: String::new(),
            attributes: Vec::new(),
        }
    }

    /// Advance to the next start tag inside the current element.
    ///
    /// Returns `Ok(true)` positioned on the new element, or `Ok(false)` once
    /// the end tag of the current element (or the end of the document) is
    /// reached. Text, comments and processing instructions in between are
    /// ignored. A sibling is never skipped: each call stops at the first
    /// start tag it meets.
    pub fn read_next_start_element(&mut self) -> Result<bool, XmlError> {
        loop {
            match self.reader.read_event()? {
                Event::Start(start) => {
                    self.enter(&start)?;
                    return Ok(true);
                }
                Event::End(_) | Event::Eof => return Ok(false),
                _ => {}
            }
        }
    }

    fn enter(&mut self, start: &BytesStart<'_>) -> Result<(), XmlError> {
        self.name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        self.attributes.clear();

        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            self.attributes.push((key, value));
        }

        Ok(())
    }

    /// Name of the current element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes of the current element, in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Value of an attribute of the current element.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of an attribute that must be present.
    pub fn required_attribute(&self, name: &'static str) -> Result<&str, XmlError> {
        self.attribute(name).ok_or_else(|| XmlError::MissingAttribute {
            element: self.name.clone(),
            attribute: name,
        })
    }

    /// Parse a required attribute.
    pub fn parse_attribute<T: FromStr>(&self, name: &'static str) -> Result<T, XmlError> {
        let raw = self.required_attribute(name)?;
        raw.trim().parse().map_err(|_| XmlError::InvalidAttribute {
            element: self.name.clone(),
            attribute: name,
            value: raw.to_string(),
        })
    }

    /// Read the text content of the current element and consume its end
    /// tag. Text inside nested elements is included.
    pub fn read_element_text(&mut self) -> Result<String, XmlError> {
        let mut text = String::new();
        let mut depth = 0usize;

        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(text),
                Event::End(_) => depth -= 1,
                Event::Eof => return Ok(text),
                _ => {}
            }
        }
    }

    /// Consume the rest of the current element, children included.
    pub fn skip_current_element(&mut self) -> Result<(), XmlError> {
        let mut depth = 0usize;

        loop {
            match self.reader.read_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(()),
                Event::End(_) => depth -= 1,
                Event::Eof => return Ok(()),
                _ => {}
            }
        }
    }
}
