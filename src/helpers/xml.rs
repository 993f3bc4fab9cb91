//! Streaming XML access for the XLSX and ODS readers.

use crate::error::ContactsError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown entity '&{0};'")]
    ParseEntityError(String),

    #[error("Invalid value '{value}' for attribute '{name}'")]
    ParseAttributeValueError { name: String, value: String },
}

/// Pull reader over a document part. Empty elements are reported as a start
/// and an end event so callers only match `Event::Start`.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.check_end_names = false;
        config.check_comments = false;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Returns the next event, or `None` at the end of the document.
    pub(crate) fn next(&mut self) -> Result<Option<Event<'_>>, ContactsError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Attribute lookup on start tags.
pub(crate) trait XmlElementExt {
    /// Unescaped value of the attribute with the qualified `name`.
    fn attribute(&self, name: &str) -> Result<Option<Cow<'_, str>>, ContactsError>;

    /// Like [`XmlElementExt::attribute`], matching the local part of the key
    /// only, so `r:id` is found whatever prefix the document binds.
    fn local_attribute(&self, local_name: &str) -> Result<Option<Cow<'_, str>>, ContactsError>;

    fn parse_attribute<T: FromStr>(&self, name: &str) -> Result<Option<T>, ContactsError>;
}

impl XmlElementExt for BytesStart<'_> {
    fn attribute(&self, name: &str) -> Result<Option<Cow<'_, str>>, ContactsError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(unescaped(attribute)?)),
            None => Ok(None),
        }
    }

    fn local_attribute(&self, local_name: &str) -> Result<Option<Cow<'_, str>>, ContactsError> {
        for attribute in self.attributes() {
            let attribute = attribute?;
            if attribute.key.local_name().as_ref() == local_name.as_bytes() {
                return Ok(Some(unescaped(attribute)?));
            }
        }
        Ok(None)
    }

    fn parse_attribute<T: FromStr>(&self, name: &str) -> Result<Option<T>, ContactsError> {
        let Some(value) = self.attribute(name)? else {
            return Ok(None);
        };
        match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(XmlError::ParseAttributeValueError {
                name: name.to_owned(),
                value: value.into_owned(),
            }
            .into()),
        }
    }
}

fn unescaped(attribute: Attribute<'_>) -> Result<Cow<'_, str>, ContactsError> {
    Ok(attribute.unescape_value()?)
}

/// Accumulates character data, resolving references as they arrive.
pub(crate) trait XmlTextBuffer {
    fn push_text(&mut self, text: &BytesText) -> Result<(), ContactsError>;

    /// Appends a general reference: `&amp;` style entities and `&#252;` or
    /// `&#xFC;` character references.
    fn push_reference(&mut self, reference: &BytesRef) -> Result<(), ContactsError>;
}

impl XmlTextBuffer for String {
    fn push_text(&mut self, text: &BytesText) -> Result<(), ContactsError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_reference(&mut self, reference: &BytesRef) -> Result<(), ContactsError> {
        let name = reference.xml_content()?;
        if let Some(character) = name.strip_prefix('#').and_then(character_reference) {
            self.push(character);
        } else if let Some(entity) = resolve_xml_entity(&name) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(name.into_owned()))?;
        }
        Ok(())
    }
}

fn character_reference(code: &str) -> Option<char> {
    let code = match code.strip_prefix(|c| c == 'x' || c == 'X') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => code.parse().ok()?,
    };
    char::from_u32(code)
}

/// Loops over the events of an [`XmlReader`] until the end of the document,
/// dispatching to the given match arms. Unmatched events are skipped and
/// `break` leaves the loop early.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect_text(xml: &str) -> Result<String, ContactsError> {
        let mut reader = XmlReader::new(Cursor::new(xml.as_bytes()));
        let mut text = String::new();
        match_xml_events!(reader => {
            Event::Text(event) => text.push_text(&event)?,
            Event::GeneralRef(event) => text.push_reference(&event)?,
        });
        Ok(text)
    }

    #[test]
    fn resolves_entities_and_character_references() {
        let text = collect_text("<t>M&amp;M &#252;ber &#x4E2D;&#X21;</t>").unwrap();
        assert_eq!(text, "M&M über 中!");
    }

    #[test]
    fn unknown_entity_is_an_error() {
        assert!(matches!(
            collect_text("<t>&nbsp;</t>"),
            Err(ContactsError::XmlHelperError(XmlError::ParseEntityError(name))) if name == "nbsp"
        ));
        assert!(collect_text("<t>&#xZZ;</t>").is_err());
    }

    #[test]
    fn attribute_lookup() -> Result<(), ContactsError> {
        let mut reader = XmlReader::new(Cursor::new(
            &b"<c table:number-columns-repeated=\"3\" r=\"B2\" n=\"x\" r:id=\"rId7\" t=\"K&amp;K\"/>"[..],
        ));
        let mut checked = false;
        match_xml_events!(reader => {
            Event::Start(event) => {
                assert_eq!(event.parse_attribute::<usize>("table:number-columns-repeated")?, Some(3));
                assert_eq!(event.attribute("r")?.as_deref(), Some("B2"));
                assert_eq!(event.attribute("t")?.as_deref(), Some("K&K"));
                assert_eq!(event.attribute("missing")?, None);
                assert_eq!(event.local_attribute("id")?.as_deref(), Some("rId7"));
                assert!(matches!(
                    event.parse_attribute::<usize>("n"),
                    Err(ContactsError::XmlHelperError(XmlError::ParseAttributeValueError { .. }))
                ));
                checked = true;
            }
        });
        assert!(checked);
        Ok(())
    }
}
