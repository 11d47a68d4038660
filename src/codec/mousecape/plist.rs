//! Generic Apple property-list (XML plist v1.0) tree, parsed with
//! `quick-xml`. Mousecape's own dict shape is layered on top of
//! this in [`super::theme`], following `quick-xml`'s own pull-parser idiom
//! directly.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use crate::error::{Error, Result};

/// One node of a parsed plist tree. Dict key order is preserved exactly as
/// encountered, since Mousecape readers downstream (§4.D "dumper") rely on a
/// key's *position* to recognize the `Cursors` dict.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Dict(Vec<(String, Value)>),
    Array(Vec<Value>),
    String(String),
    Real(f64),
    Integer(i64),
    Bool(bool),
    Data(Vec<u8>),
}

impl Value {
    pub fn as_dict(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn dict_get<'a>(entries: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
        entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Parses the `<dict>` body of a plist document's `<plist>` root.
///
/// ## Errors
///
/// If the XML is malformed, or the document has no top-level `<dict>`.
pub fn parse(xml: &[u8]) -> Result<Value> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text = true;

    loop {
        match reader
            .read_event()
            .map_err(|e| Error::invalid_data("mousecape::plist::parse", e.to_string()))?
        {
            Event::Start(tag) if tag.local_name().as_ref() == b"dict" => {
                return parse_dict(&mut reader);
            }
            Event::Eof => {
                return Err(Error::invalid_data(
                    "mousecape::plist::parse",
                    "no top-level <dict> found",
                ));
            }
            _ => {}
        }
    }
}

fn parse_dict(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let mut entries = Vec::new();

    loop {
        let key = match next_meaningful(reader)? {
            Event::End(tag) if tag.local_name().as_ref() == b"dict" => break,
            Event::Start(tag) if tag.local_name().as_ref() == b"key" => read_text(reader)?,
            other => {
                return Err(unexpected(&other));
            }
        };

        let value = parse_value(reader)?;
        entries.push((key, value));
    }

    Ok(Value::Dict(entries))
}

fn parse_array(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let mut items = Vec::new();

    loop {
        match next_meaningful(reader)? {
            Event::End(tag) if tag.local_name().as_ref() == b"array" => break,
            event => items.push(parse_value_from(reader, event)?),
        }
    }

    Ok(Value::Array(items))
}

fn parse_value(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let event = next_meaningful(reader)?;
    parse_value_from(reader, event)
}

fn parse_value_from(reader: &mut Reader<&[u8]>, event: Event<'_>) -> Result<Value> {
    match event {
        Event::Start(tag) => {
            let name = tag.local_name().as_ref().to_vec();
            match name.as_slice() {
                b"dict" => parse_dict(reader),
                b"array" => parse_array(reader),
                b"string" => Ok(Value::String(read_text(reader)?)),
                b"real" => parse_f64(&read_text(reader)?).map(Value::Real),
                b"integer" => parse_i64(&read_text(reader)?).map(Value::Integer),
                b"data" => decode_base64(&read_text(reader)?).map(Value::Data),
                other => Err(Error::invalid_data(
                    "mousecape::plist::parse",
                    format!("unexpected element <{}>", String::from_utf8_lossy(other)),
                )),
            }
        }
        Event::Empty(tag) => match tag.local_name().as_ref() {
            b"true" => Ok(Value::Bool(true)),
            b"false" => Ok(Value::Bool(false)),
            other => Err(Error::invalid_data(
                "mousecape::plist::parse",
                format!("unexpected empty element <{}/>", String::from_utf8_lossy(other)),
            )),
        },
        other => Err(unexpected(&other)),
    }
}

fn next_meaningful<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>> {
    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::invalid_data("mousecape::plist::parse", e.to_string()))?;
        if !matches!(event, Event::Text(_) | Event::Comment(_) | Event::Decl(_) | Event::DocType(_)) {
            return Ok(event);
        }
    }
}

fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    match reader
        .read_event()
        .map_err(|e| Error::invalid_data("mousecape::plist::parse", e.to_string()))?
    {
        Event::Text(text) => {
            let value = text
                .unescape()
                .map_err(|e| Error::invalid_data("mousecape::plist::parse", e.to_string()))?
                .into_owned();
            reader
                .read_event()
                .map_err(|e| Error::invalid_data("mousecape::plist::parse", e.to_string()))?; // consume End
            Ok(value)
        }
        Event::End(_) => Ok(String::new()),
        other => Err(unexpected(&other)),
    }
}

fn parse_f64(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| Error::invalid_data("mousecape::plist::parse", format!("'{s}' is not a real number")))
}

fn parse_i64(s: &str) -> Result<i64> {
    s.trim()
        .parse()
        .map_err(|_| Error::invalid_data("mousecape::plist::parse", format!("'{s}' is not an integer")))
}

fn decode_base64(s: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| Error::invalid_data("mousecape::plist::parse", e.to_string()))
}

fn unexpected(event: &Event<'_>) -> Error {
    Error::invalid_data("mousecape::plist::parse", format!("unexpected event {event:?}"))
}

/// Serializes `root` (expected to be a [`Value::Dict`]) as a complete plist
/// v1.0 XML document with lexically ordered keys.
///
/// ## Errors
///
/// If the underlying XML writer fails (an allocation or encoding fault).
pub fn write_document(root: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    buf.extend_from_slice(
        b"<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
    );

    let mut writer = Writer::new(&mut buf);
    let mut plist_tag = BytesStart::new("plist");
    plist_tag.push_attribute(("version", "1.0"));
    writer
        .write_event(Event::Start(plist_tag))
        .map_err(|e| Error::invalid_data("mousecape::plist::write", e.to_string()))?;

    write_value(&mut writer, root)?;

    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("plist")))
        .map_err(|e| Error::invalid_data("mousecape::plist::write", e.to_string()))?;
    buf.push(b'\n');

    Ok(buf)
}

fn write_value(writer: &mut Writer<&mut Vec<u8>>, value: &Value) -> Result<()> {
    let io_err = |e: quick_xml::Error| Error::invalid_data("mousecape::plist::write", e.to_string());

    match value {
        Value::Dict(entries) => {
            let mut sorted = entries.to_vec();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            writer
                .write_event(Event::Start(BytesStart::new("dict")))
                .map_err(io_err)?;
            for (key, v) in &sorted {
                writer
                    .write_event(Event::Start(BytesStart::new("key")))
                    .map_err(io_err)?;
                writer
                    .write_event(Event::Text(BytesText::new(key)))
                    .map_err(io_err)?;
                writer
                    .write_event(Event::End(quick_xml::events::BytesEnd::new("key")))
                    .map_err(io_err)?;
                write_value(writer, v)?;
            }
            writer
                .write_event(Event::End(quick_xml::events::BytesEnd::new("dict")))
                .map_err(io_err)?;
        }
        Value::Array(items) => {
            writer
                .write_event(Event::Start(BytesStart::new("array")))
                .map_err(io_err)?;
            for item in items {
                write_value(writer, item)?;
            }
            writer
                .write_event(Event::End(quick_xml::events::BytesEnd::new("array")))
                .map_err(io_err)?;
        }
        Value::String(s) => write_leaf(writer, "string", s)?,
        Value::Real(r) => write_leaf(writer, "real", &format!("{r}"))?,
        Value::Integer(i) => write_leaf(writer, "integer", &format!("{i}"))?,
        Value::Bool(b) => {
            let tag = if *b { "true" } else { "false" };
            writer
                .write_event(Event::Empty(BytesStart::new(tag)))
                .map_err(io_err)?;
        }
        Value::Data(bytes) => {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            write_leaf(writer, "data", &encoded)?;
        }
    }

    Ok(())
}

fn write_leaf(writer: &mut Writer<&mut Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    let io_err = |e: quick_xml::Error| Error::invalid_data("mousecape::plist::write", e.to_string());
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(io_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(io_err)?;
    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new(tag)))
        .map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_a_small_dict() {
        let value = Value::Dict(vec![
            ("Name".to_string(), Value::String("Test".to_string())),
            ("Version".to_string(), Value::Real(1.5)),
            ("HiDPI".to_string(), Value::Bool(true)),
        ]);

        let xml = write_document(&value).unwrap();
        let parsed = parse(&xml).unwrap();

        let entries = parsed.as_dict().unwrap();
        assert_eq!(Value::dict_get(entries, "Name").unwrap().as_str(), Some("Test"));
        assert_eq!(Value::dict_get(entries, "Version").unwrap().as_real(), Some(1.5));
        assert_eq!(Value::dict_get(entries, "HiDPI").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn round_trips_base64_data() {
        let value = Value::Dict(vec![("Blob".to_string(), Value::Data(vec![1, 2, 3, 4, 250]))]);
        let xml = write_document(&value).unwrap();
        let parsed = parse(&xml).unwrap();
        let entries = parsed.as_dict().unwrap();
        assert_eq!(
            Value::dict_get(entries, "Blob").unwrap().as_data(),
            Some([1, 2, 3, 4, 250].as_slice())
        );
    }
}
