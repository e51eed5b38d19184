//! Request envelope encoding
//!
//! Field names and values are not validated against any business rule here;
//! the only contract is that the output is well-formed XML which reflects the
//! input losslessly. Input that cannot satisfy that contract (an empty batch,
//! a tag name that is not an XML name, characters XML 1.0 cannot carry) is
//! rejected with [`Error::Encoding`].

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Error, Result};

/// Value of one request field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Emitted as a single leaf element
    Single(String),
    /// Emitted as one leaf element per item, all sharing the field name
    Multiple(Vec<String>),
}

impl ParamValue {
    /// The values in emission order
    pub fn values(&self) -> &[String] {
        match self {
            ParamValue::Single(value) => std::slice::from_ref(value),
            ParamValue::Multiple(values) => values,
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Single(value.clone())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Multiple(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ParamValue {
    fn from(values: &[&str]) -> Self {
        ParamValue::Multiple(values.iter().map(|v| v.to_string()).collect())
    }
}

/// One `RequestParameters` block: an ordered field → value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBlock {
    fields: Vec<(String, ParamValue)>,
}

impl ParamBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, replacing an existing value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Insert a field only when a value is present
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl Into<ParamValue>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.fields.iter().find(|(name, _)| name == key).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, ParamValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ParamBlock
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut block = ParamBlock::new();
        for (key, value) in iter {
            block.insert(key, value);
        }
        block
    }
}

/// The parameter blocks of one call; more than one block means batch mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBlocks(Vec<ParamBlock>);

impl ParamBlocks {
    pub fn blocks(&self) -> &[ParamBlock] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ParamBlock> for ParamBlocks {
    fn from(block: ParamBlock) -> Self {
        ParamBlocks(vec![block])
    }
}

impl From<Vec<ParamBlock>> for ParamBlocks {
    fn from(blocks: Vec<ParamBlock>) -> Self {
        ParamBlocks(blocks)
    }
}

/// Serialize parameter blocks and credentials into the request envelope
pub fn encode_request(blocks: &ParamBlocks, username: &str, session_token: &str) -> Result<Vec<u8>> {
    if blocks.is_empty() {
        return Err(Error::encoding(
            "at least one RequestParameters block is required",
        ));
    }

    for block in blocks.blocks() {
        for (name, value) in block.fields() {
            if !is_xml_name(name) {
                return Err(Error::encoding(format!(
                    "field name {:?} is not a valid XML element name",
                    name
                )));
            }
            for item in value.values() {
                check_text(name, item)?;
            }
        }
    }
    check_text("Username", username)?;
    check_text("SessionToken", session_token)?;

    let mut writer = Writer::new(Vec::new());
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write(&mut writer, Event::Start(BytesStart::new("Request")))?;

    write(&mut writer, Event::Start(BytesStart::new("UsernameToken")))?;
    write_leaf(&mut writer, "Username", username)?;
    write_leaf(&mut writer, "SessionToken", session_token)?;
    write(&mut writer, Event::End(BytesEnd::new("UsernameToken")))?;

    for block in blocks.blocks() {
        write(&mut writer, Event::Start(BytesStart::new("RequestParameters")))?;
        for (name, value) in block.fields() {
            for item in value.values() {
                write_leaf(&mut writer, name, item)?;
            }
        }
        write(&mut writer, Event::End(BytesEnd::new("RequestParameters")))?;
    }

    write(&mut writer, Event::End(BytesEnd::new("Request")))?;
    Ok(writer.into_inner())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::encoding(format!("failed to write XML: {}", e)))
}

fn write_leaf(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    // escape covers &, <, >, ' and "; a raw CR would be normalized away by the reader
    let escaped = escape(text);
    let content = if escaped.contains('\r') {
        BytesText::from_escaped(escaped.replace('\r', "&#13;"))
    } else {
        BytesText::from_escaped(escaped)
    };
    write(writer, Event::Text(content))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

/// XML 1.0 element name check, restricted to names without a namespace prefix
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn check_text(field: &str, text: &str) -> Result<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(Error::encoding(format!(
            "field {:?} contains character U+{:04X}, which XML cannot represent",
            field, c as u32
        ))),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_str(blocks: impl Into<ParamBlocks>) -> String {
        let bytes = encode_request(&blocks.into(), "user", "token").unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_single_block_layout() {
        let xml = encode_str(ParamBlock::new().with("f4indexno", "S0123456789"));
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Request>\
             <UsernameToken><Username>user</Username><SessionToken>token</SessionToken></UsernameToken>\
             <RequestParameters><f4indexno>S0123456789</f4indexno></RequestParameters>\
             </Request>"
        );
    }

    #[test]
    fn test_repeated_field_emits_one_leaf_per_value() {
        let xml = encode_str(ParamBlock::new().with("f4indexno", vec!["A", "B"]));
        assert!(xml.contains(
            "<RequestParameters><f4indexno>A</f4indexno><f4indexno>B</f4indexno></RequestParameters>"
        ));
    }

    #[test]
    fn test_values_are_escaped() {
        let xml = encode_str(ParamBlock::new().with("Name", "A & B <C> \"D\""));
        assert!(xml.contains("<Name>A &amp; B &lt;C&gt; &quot;D&quot;</Name>"));
    }

    #[test]
    fn test_carriage_return_survives_as_reference() {
        let xml = encode_str(ParamBlock::new().with("Note", "a\r\nb"));
        assert!(!xml.contains('\r'));
        assert!(xml.contains("<Note>a&#13;\nb</Note>"));

        let tree = crate::xml::decode_response(xml.as_bytes()).unwrap();
        assert_eq!(tree.text("RequestParameters.Note").unwrap(), "a\r\nb");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut block = ParamBlock::new().with("a", "1").with("b", "2");
        block.insert("a", "3");
        let names: Vec<_> = block.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(block.get("a"), Some(&ParamValue::Single("3".to_string())));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let err = encode_request(&ParamBlocks::default(), "user", "token").unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
    }

    #[test]
    fn test_invalid_field_name_is_rejected() {
        for name in ["", "1abc", "two words", "a<b", "ns:tag"] {
            let block = ParamBlock::new().with(name, "x");
            let err = encode_request(&block.into(), "user", "token").unwrap_err();
            assert!(matches!(err, Error::Encoding { .. }), "name {:?}", name);
        }
    }

    #[test]
    fn test_control_characters_are_rejected() {
        let block = ParamBlock::new().with("f4indexno", "S01\u{0}");
        let err = encode_request(&block.into(), "user", "token").unwrap_err();
        assert!(err.to_string().contains("U+0000"));
    }

    #[test]
    fn test_empty_block_still_emitted() {
        let xml = encode_str(ParamBlock::new());
        assert!(xml.contains("<RequestParameters></RequestParameters>"));
    }
}
