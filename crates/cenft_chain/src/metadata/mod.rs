//! # Token Metadata
//!
//! Decoding of `tokenURI` values. Three shapes are understood:
//!
//! | Shape                                 | Handling                         |
//! |---------------------------------------|----------------------------------|
//! | `data:application/json;base64,<b64>`  | decode, then parse JSON          |
//! | `http...` URL                         | placeholder carrying the URL     |
//! | anything else                         | parse as raw JSON                |
//!
//! [`parse_token_uri`] never fails. One unreadable token must not stop the
//! discovery of the others, so every failure turns into placeholder data
//! that carries an `Error` attribute.

use std::sync::OnceLock;

use alloy_primitives::U256;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of inline base64 JSON metadata.
pub const INLINE_JSON_PREFIX: &str = "data:application/json;base64,";

/// Characters of the raw URI kept in the error placeholder.
const RAW_URI_PREVIEW: usize = 30;

/// Lenient about padding and trailing bits, like a browser's `atob`.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Error, Debug)]
enum DecodeError {
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("metadata is not a JSON object")]
    NotAnObject,
}

/// Decoded metadata of one token. Always a JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenMetadata(Map<String, Value>);

impl TokenMetadata {
    /// Wraps a JSON object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Metadata for a token whose `tokenURI` could not be read at all.
    #[must_use]
    pub fn unavailable(token_id: U256) -> Self {
        object(json!({
            "name": format!("NFT #{token_id}"),
            "description": "metadata unavailable",
            "attributes": [],
        }))
    }

    /// The `name` field, if it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// The `description` field, if it is a string.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.0.get("description").and_then(Value::as_str)
    }

    /// The `image` field, if it is a string.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.0.get("image").and_then(Value::as_str)
    }

    /// Value of the attribute with the given `trait_type`.
    #[must_use]
    pub fn attribute(&self, trait_type: &str) -> Option<&Value> {
        self.0
            .get("attributes")?
            .as_array()?
            .iter()
            .find(|attr| attr["trait_type"].as_str() == Some(trait_type))
            .map(|attr| &attr["value"])
    }

    /// Whether this is placeholder data produced by a decode failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.attribute("Error").is_some()
    }

    /// All fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the metadata, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

fn object(value: Value) -> TokenMetadata {
    match value {
        Value::Object(fields) => TokenMetadata(fields),
        _ => TokenMetadata::default(),
    }
}

fn parse_object(text: &str) -> Result<TokenMetadata, DecodeError> {
    match serde_json::from_str(text)? {
        Value::Object(fields) => Ok(TokenMetadata(fields)),
        _ => Err(DecodeError::NotAnObject),
    }
}

/// Decodes a token URI into metadata. Total: never fails, never fetches.
#[must_use]
pub fn parse_token_uri(uri: &str) -> TokenMetadata {
    match try_parse(uri) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!("failed to parse token metadata: {}", err);
            error_placeholder(uri)
        }
    }
}

fn try_parse(uri: &str) -> Result<TokenMetadata, DecodeError> {
    if let Some(payload) = uri.strip_prefix(INLINE_JSON_PREFIX) {
        let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = BASE64.decode(payload)?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&*text);
        return Ok(parse_inline_json(text, uri));
    }

    if uri.starts_with("http") {
        debug!("external token metadata left unfetched: {}", uri);
        return Ok(external_placeholder(uri));
    }

    parse_object(uri)
}

fn parse_inline_json(text: &str, uri: &str) -> TokenMetadata {
    match parse_object(text) {
        Ok(metadata) => return metadata,
        Err(err) => debug!("inline metadata is not valid JSON, stripping control characters: {}", err),
    }

    let cleaned: String = text.chars().filter(|c| !is_unprintable(*c)).collect();
    match parse_object(&cleaned) {
        Ok(metadata) => return metadata,
        Err(err) => warn!("inline metadata still invalid, extracting fields: {}", err),
    }

    extracted_placeholder(text, uri)
}

/// C0 and C1 control characters, plus DEL.
const fn is_unprintable(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}')
}

static NAME_FIELD: OnceLock<Option<Regex>> = OnceLock::new();
static DESCRIPTION_FIELD: OnceLock<Option<Regex>> = OnceLock::new();

fn field_pattern(cell: &'static OnceLock<Option<Regex>>, field: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(&format!(r#""{field}"\s*:\s*"([^"]+)""#)).ok())
        .as_ref()
}

fn extract_string_field(text: &str, pattern: Option<&Regex>) -> Option<String> {
    pattern?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn extracted_placeholder(text: &str, uri: &str) -> TokenMetadata {
    let token_id = uri.split_once("tokenId=").map_or("Unknown", |(_, id)| id);

    object(json!({
        "name": extract_string_field(text, field_pattern(&NAME_FIELD, "name"))
            .unwrap_or_else(|| "Unknown NFT".to_string()),
        "description": extract_string_field(text, field_pattern(&DESCRIPTION_FIELD, "description"))
            .unwrap_or_else(|| "description unavailable".to_string()),
        "attributes": [
            { "trait_type": "TokenId", "value": token_id },
            { "trait_type": "Data Source", "value": "Extracted from metadata" },
            { "trait_type": "Error", "value": "malformed metadata JSON" },
        ],
    }))
}

fn external_placeholder(uri: &str) -> TokenMetadata {
    object(json!({
        "name": "External NFT",
        "description": "metadata must be fetched from the external URL",
        "attributes": [{ "trait_type": "URL", "value": uri }],
    }))
}

fn error_placeholder(uri: &str) -> TokenMetadata {
    let preview: String = uri.chars().take(RAW_URI_PREVIEW).collect();

    object(json!({
        "name": "Unknown NFT",
        "description": "metadata could not be parsed",
        "attributes": [
            { "trait_type": "Error", "value": "parse failed" },
            { "trait_type": "Raw URI", "value": format!("{preview}...") },
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn inline(json: &str) -> String {
        format!("{INLINE_JSON_PREFIX}{}", STANDARD.encode(json))
    }

    #[test]
    fn test_inline_badge() {
        let metadata = parse_token_uri(&inline(r#"{"name":"Badge"}"#));

        let expected: Map<String, Value> = [("name".to_string(), json!("Badge"))].into_iter().collect();
        assert_eq!(metadata, TokenMetadata::new(expected));
        assert!(!metadata.is_error());
    }

    #[test]
    fn test_inline_round_trip() {
        let original = json!({
            "name": "签到纪念 #3",
            "description": "Check-in at RustConf",
            "image": "ipfs://bafy/3.png",
            "attributes": [{ "trait_type": "Event", "value": 7 }],
        });

        let metadata = parse_token_uri(&inline(&original.to_string()));

        assert_eq!(Value::Object(metadata.clone().into_fields()), original);
        assert_eq!(metadata.name(), Some("签到纪念 #3"));
        assert_eq!(metadata.image(), Some("ipfs://bafy/3.png"));
        assert_eq!(metadata.attribute("Event"), Some(&json!(7)));
    }

    #[test]
    fn test_inline_missing_padding() {
        let encoded = STANDARD.encode(r#"{"name":"Pad"}"#);
        let uri = format!("{INLINE_JSON_PREFIX}{}", encoded.trim_end_matches('='));

        assert_eq!(parse_token_uri(&uri).name(), Some("Pad"));
    }

    #[test]
    fn test_inline_control_characters_stripped() {
        let metadata = parse_token_uri(&inline("{\"name\":\"Ba\ndge\u{1}\"}"));

        assert_eq!(metadata.name(), Some("Badge"));
        assert!(!metadata.is_error());
    }

    #[test]
    fn test_inline_field_extraction() {
        let metadata = parse_inline_json(
            r#"{"name":"Early Bird","description":"first 10", "attributes": [oops"#,
            "data:application/json;base64,e30=?tokenId=9",
        );

        assert_eq!(metadata.name(), Some("Early Bird"));
        assert_eq!(metadata.description(), Some("first 10"));
        assert_eq!(metadata.attribute("TokenId"), Some(&json!("9")));
        assert!(metadata.is_error());
    }

    #[test]
    fn test_inline_byte_order_mark() {
        let metadata = parse_token_uri(&inline("\u{feff}{\"name\":\"Badge\"}"));

        assert_eq!(metadata.name(), Some("Badge"));
        assert!(!metadata.is_error());
    }

    #[test]
    fn test_field_patterns_compiled_once() {
        let first = field_pattern(&NAME_FIELD, "name").unwrap();
        let second = field_pattern(&NAME_FIELD, "name").unwrap();

        assert!(std::ptr::eq(first, second));
        assert!(first.is_match(r#""name" : "x""#));
    }

    #[test]
    fn test_inline_garbage_json() {
        let metadata = parse_token_uri(&inline("not json at all"));

        assert_eq!(metadata.name(), Some("Unknown NFT"));
        assert_eq!(metadata.attribute("TokenId"), Some(&json!("Unknown")));
        assert!(metadata.is_error());
    }

    #[test]
    fn test_malformed_base64() {
        let uri = format!("{INLINE_JSON_PREFIX}!!!not-base64!!!");
        let metadata = parse_token_uri(&uri);

        assert_eq!(metadata.name(), Some("Unknown NFT"));
        assert_eq!(metadata.attribute("Error"), Some(&json!("parse failed")));
        assert_eq!(
            metadata.attribute("Raw URI"),
            Some(&json!("data:application/json;base64,!...")),
        );
    }

    #[test]
    fn test_external_url_not_fetched() {
        let metadata = parse_token_uri("https://example.com/m.json");

        assert_eq!(metadata.name(), Some("External NFT"));
        assert_eq!(metadata.attribute("URL"), Some(&json!("https://example.com/m.json")));
        assert!(!metadata.is_error());
    }

    #[test]
    fn test_raw_json_and_text() {
        let metadata = parse_token_uri(r#"{"name":"Raw","description":"plain"}"#);
        assert_eq!(metadata.description(), Some("plain"));

        assert!(parse_token_uri("hello world").is_error());
        assert!(parse_token_uri("42").is_error());
        assert!(parse_token_uri("").is_error());
    }

    #[test]
    fn test_raw_uri_preview_is_char_safe() {
        let uri = "签".repeat(40);
        let metadata = parse_token_uri(&uri);

        let preview = metadata.attribute("Raw URI").and_then(Value::as_str).unwrap();
        assert_eq!(preview.chars().count(), RAW_URI_PREVIEW + 3);
    }

    #[test]
    fn test_unavailable_placeholder() {
        let metadata = TokenMetadata::unavailable(U256::from(12));

        assert_eq!(metadata.name(), Some("NFT #12"));
        assert_eq!(metadata.fields()["attributes"], json!([]));
    }
}
