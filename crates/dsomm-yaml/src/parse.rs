//! YAML parser adapter
//!
//! Thin wrapper over `serde_yaml` for:
//! - Single-document parsing
//! - Multi-document streams
//! - Serializing documents back to text
//!
//! Malformed YAML is always fatal; errors carry the underlying parser
//! message and no recovery is attempted. Boolean literal forms from the
//! YAML 1.1 schema (`yes`, `on`, ...) that `serde_yaml` keeps as strings
//! are honored by the typed model layer where a flag is actually read.

use serde::Deserialize;
use serde_yaml::Value;

/// A parsed YAML document tree: mappings, sequences and scalars.
pub type Document = Value;

/// Parse a single-document YAML string.
///
/// # Errors
/// Returns the parser error if the text is not valid single-document YAML.
pub fn parse(text: &str) -> Result<Document, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// Parse a multi-document YAML stream into one document per `---` section.
///
/// # Errors
/// Returns the parser error for the first malformed document.
pub fn parse_multi(text: &str) -> Result<Vec<Document>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(text) {
        documents.push(Value::deserialize(doc)?);
    }
    Ok(documents)
}

/// Serialize a document back to YAML text.
///
/// # Errors
/// Returns the serializer error if the document cannot be represented.
pub fn to_string(doc: &Document) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid() {
        let doc = parse("name: test\nvalue: 42\nnested:\n  key: value\n").unwrap();
        assert_eq!(doc.get("name"), Some(&Value::String("test".to_string())));
        assert_eq!(doc["nested"]["key"], Value::String("value".to_string()));
    }

    #[test]
    fn parse_invalid_is_fatal() {
        let result = parse("key: [unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn parse_multi_documents() {
        let docs = parse_multi("---\nname: doc1\n---\nname: doc2\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["name"], Value::String("doc2".to_string()));
    }

    #[test]
    fn parse_multi_single_document() {
        let docs = parse_multi("name: only\n").unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn roundtrip_to_string() {
        let doc = parse("a:\n  b: 1\n").unwrap();
        let text = to_string(&doc).unwrap();
        let again = parse(&text).unwrap();
        assert_eq!(doc, again);
    }
}
