//! Minimal XML property list support.
//!
//! Reading covers the value types found in provisioning profiles and
//! export options. Writing only emits flat string dictionaries.

use std::collections::BTreeMap;

use crate::types::BuildError;

pub(crate) const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
"#;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(String),
    Data(String),
    Array(Vec<Value>),
    Dictionary(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// `true` for `<true/>` and for the string `"true"`.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }
}

/// Parses the top-level `<dict>` of an XML property list.
pub fn parse_dictionary(xml: &str) -> Result<BTreeMap<String, Value>, BuildError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(xml.trim_start(), options)
        .map_err(|e| BuildError::Plist(e.to_string()))?;

    let root = doc.root_element();
    if !root.has_tag_name("plist") {
        return Err(BuildError::Plist(format!(
            "expected <plist> root, found <{}>",
            root.tag_name().name()
        )));
    }
    let dict = root
        .children()
        .find(|n| n.is_element())
        .ok_or_else(|| BuildError::Plist("empty plist".to_string()))?;

    match parse_value(dict)? {
        Value::Dictionary(entries) => Ok(entries),
        _ => Err(BuildError::Plist("top-level value is not a dictionary".to_string())),
    }
}

fn parse_value(node: roxmltree::Node<'_, '_>) -> Result<Value, BuildError> {
    let text = || node.text().unwrap_or_default().trim().to_string();

    let value = match node.tag_name().name() {
        "string" => Value::String(node.text().unwrap_or_default().to_string()),
        "integer" => Value::Integer(
            text()
                .parse()
                .map_err(|_| BuildError::Plist(format!("invalid integer '{}'", text())))?,
        ),
        "real" => Value::Real(
            text()
                .parse()
                .map_err(|_| BuildError::Plist(format!("invalid real '{}'", text())))?,
        ),
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "date" => Value::Date(text()),
        "data" => Value::Data(text().split_whitespace().collect()),
        "array" => Value::Array(
            node.children()
                .filter(|n| n.is_element())
                .map(parse_value)
                .collect::<Result<_, _>>()?,
        ),
        "dict" => {
            let mut entries = BTreeMap::new();
            let mut children = node.children().filter(|n| n.is_element());
            while let Some(key) = children.next() {
                if !key.has_tag_name("key") {
                    return Err(BuildError::Plist(format!(
                        "expected <key>, found <{}>",
                        key.tag_name().name()
                    )));
                }
                let name = key.text().unwrap_or_default().to_string();
                let value = children
                    .next()
                    .ok_or_else(|| BuildError::Plist(format!("key '{}' has no value", name)))?;
                entries.insert(name, parse_value(value)?);
            }
            Value::Dictionary(entries)
        }
        other => return Err(BuildError::Plist(format!("unsupported element <{}>", other))),
    };
    Ok(value)
}

/// Renders a flat dictionary of strings.
pub fn write_string_dictionary<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::from(HEADER);
    out.push_str("<dict>\n");
    for (key, value) in entries {
        out.push_str(&format!(
            "\t<key>{}</key>\n\t<string>{}</string>\n",
            escape(key),
            escape(value)
        ));
    }
    out.push_str("</dict>\n</plist>\n");
    out
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
