//! Wire codec for [`NodeControls`].
//!
//! On the wire a snapshot is a map with two optional entries:
//!
//! - `timestamp`: the observation time as rendered by [`render_time`], omitted
//!   for the unset snapshot
//! - `controls`: the control identifiers, omitted when there are none
//!
//! Decoding accepts the entries in any order, skips unknown keys, treats a
//! missing or `null` entry as unset, and maps a top-level nil to
//! [`NodeControls::make_empty`]. Map keys are matched as borrowed slices and
//! the timestamp is parsed in place, so the only allocations are the control
//! identifiers themselves.
//!
//! `NodeControls` deliberately has no generic serde form: its `Serialize` and
//! `Deserialize` impls fail with [`GENERIC_CODEC_UNSUPPORTED`]. Reach the codec
//! through [`WireNodeControls`], [`WireCodec`], or in a containing type:
//!
//! ```
//! use node_controls_core::NodeControls;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct NodeReport {
//!     #[serde(with = "node_controls_core::wire")]
//!     controls: NodeControls,
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CodecError, Result};
use crate::node::NodeControls;
use crate::set::StringSet;
use crate::time::{parse_time, render_time};

/// Error message produced when `NodeControls` goes through generic serde.
pub const GENERIC_CODEC_UNSUPPORTED: &str =
    "NodeControls has no generic serde form; encode it with node_controls_core::wire";

const TIMESTAMP_KEY: &str = "timestamp";
const CONTROLS_KEY: &str = "controls";

/// Write `controls` in the wire form.
///
/// Usable as `#[serde(serialize_with = "node_controls_core::wire::serialize")]`.
///
/// # Errors
///
/// Returns the serializer's error if writing fails or if the timestamp's
/// year is outside 0000-9999.
pub fn serialize<S: Serializer>(
    controls: &NodeControls,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let timestamp = controls.timestamp();
    let ids = controls.controls();
    let len = usize::from(timestamp.is_some()) + usize::from(!ids.is_empty());

    let mut map = serializer.serialize_map(Some(len))?;
    if let Some(timestamp) = timestamp {
        let rendered = render_time(timestamp).map_err(ser::Error::custom)?;
        map.serialize_entry(TIMESTAMP_KEY, &rendered)?;
    }
    if !ids.is_empty() {
        map.serialize_entry(CONTROLS_KEY, ids)?;
    }
    map.end()
}

/// Read a `NodeControls` from its wire form.
///
/// Usable as `#[serde(deserialize_with = "node_controls_core::wire::deserialize")]`.
///
/// # Errors
///
/// Returns the deserializer's error if the input is not a map or nil, or if
/// the timestamp does not parse.
pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<NodeControls, D::Error> {
    deserializer.deserialize_option(NodeControlsVisitor)
}

impl Serialize for NodeControls {
    fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
        tracing::error!("{GENERIC_CODEC_UNSUPPORTED}");
        Err(ser::Error::custom(GENERIC_CODEC_UNSUPPORTED))
    }
}

impl<'de> Deserialize<'de> for NodeControls {
    fn deserialize<D: Deserializer<'de>>(_deserializer: D) -> std::result::Result<Self, D::Error> {
        tracing::error!("{GENERIC_CODEC_UNSUPPORTED}");
        Err(de::Error::custom(GENERIC_CODEC_UNSUPPORTED))
    }
}

/// A `NodeControls` that serializes through the wire codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireNodeControls(pub NodeControls);

impl From<NodeControls> for WireNodeControls {
    fn from(controls: NodeControls) -> Self {
        Self(controls)
    }
}

impl From<WireNodeControls> for NodeControls {
    fn from(wire: WireNodeControls) -> Self {
        wire.0
    }
}

impl Serialize for WireNodeControls {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for WireNodeControls {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize(deserializer).map(Self)
    }
}

/// Borrowed adapter so encoding does not clone the snapshot.
struct WireRef<'a>(&'a NodeControls);

impl Serialize for WireRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize(self.0, serializer)
    }
}

struct NodeControlsVisitor;

impl<'de> Visitor<'de> for NodeControlsVisitor {
    type Value = NodeControls;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a node controls map or nil")
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(NodeControls::make_empty())
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(NodeControls::make_empty())
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut timestamp = None;
        let mut controls = StringSet::new();

        while let Some(field) = map.next_key::<Field>()? {
            match field {
                Field::Timestamp => timestamp = map.next_value::<WireTimestamp>()?.0,
                Field::Controls => {
                    controls = map.next_value::<Option<StringSet>>()?.unwrap_or_default();
                }
                Field::Ignored => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(NodeControls::new(timestamp, controls))
    }
}

/// A wire map key, matched without allocating.
///
/// Keys that are not text, such as integer keys in CBOR, are skipped like
/// any other unknown key.
enum Field {
    Timestamp,
    Controls,
    Ignored,
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(FieldVisitor)
    }
}

struct FieldVisitor;

impl<'de> Visitor<'de> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a field name")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
        Ok(match value {
            TIMESTAMP_KEY => Field::Timestamp,
            CONTROLS_KEY => Field::Controls,
            _ => Field::Ignored,
        })
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> std::result::Result<Self::Value, E> {
        Ok(match value {
            b"timestamp" => Field::Timestamp,
            b"controls" => Field::Controls,
            _ => Field::Ignored,
        })
    }

    fn visit_u64<E: de::Error>(self, _value: u64) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_i64<E: de::Error>(self, _value: i64) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_u128<E: de::Error>(self, _value: u128) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_i128<E: de::Error>(self, _value: i128) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_f64<E: de::Error>(self, _value: f64) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_bool<E: de::Error>(self, _value: bool) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Field::Ignored)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Field::Ignored)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Field::Ignored)
    }
}

/// The `timestamp` entry, parsed straight from the borrowed string.
struct WireTimestamp(Option<DateTime<Utc>>);

impl<'de> Deserialize<'de> for WireTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_option(TimestampVisitor)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = WireTimestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 timestamp string")
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(WireTimestamp(None))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(WireTimestamp(None))
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_str(self)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
        parse_time(value).map(WireTimestamp).map_err(E::custom)
    }
}

/// Encoding used for wire payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON text.
    #[default]
    Json,
    /// CBOR binary.
    Cbor,
}

impl WireFormat {
    /// Return the lowercase name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Cbor => "cbor",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown wire format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wire format: {0} (expected json or cbor)")]
pub struct UnknownWireFormat(pub String);

impl FromStr for WireFormat {
    type Err = UnknownWireFormat;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "cbor" => Ok(Self::Cbor),
            _ => Err(UnknownWireFormat(s.to_string())),
        }
    }
}

/// Configuration for a [`WireCodec`].
#[derive(Debug, Clone, Deserialize)]
pub struct CodecConfig {
    /// Payload encoding.
    #[serde(default)]
    pub format: WireFormat,

    /// Largest payload accepted for decoding, in bytes.
    #[serde(default = "CodecConfig::default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl CodecConfig {
    const fn default_max_payload_bytes() -> usize {
        1024 * 1024 // 1 MB
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::default(),
            max_payload_bytes: Self::default_max_payload_bytes(),
        }
    }
}

/// Encodes and decodes wire payloads in one configured format.
#[derive(Debug, Clone, Default)]
pub struct WireCodec {
    config: CodecConfig,
}

impl WireCodec {
    /// Create a codec with the given configuration.
    #[must_use]
    pub const fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Create a codec for `format` with default limits.
    #[must_use]
    pub fn with_format(format: WireFormat) -> Self {
        Self::new(CodecConfig {
            format,
            ..CodecConfig::default()
        })
    }

    /// Get the codec configuration.
    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the underlying writer fails.
    pub fn encode(&self, controls: &NodeControls) -> Result<Vec<u8>> {
        self.encode_value(&WireRef(controls))
    }

    /// Decode one snapshot. An empty payload decodes to the unset snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::PayloadTooLarge` if the payload exceeds the limit
    /// and `CodecError::Decode` if it is malformed.
    pub fn decode(&self, bytes: &[u8]) -> Result<NodeControls> {
        if bytes.is_empty() {
            return Ok(NodeControls::make_empty());
        }
        self.decode_value::<WireNodeControls>(bytes).map(Into::into)
    }

    /// Encode any value, such as a report embedding [`WireNodeControls`].
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnsupportedGenericCodec` if the value reaches
    /// `NodeControls` through generic serde, and `CodecError::Encode` for any
    /// other failure.
    pub fn encode_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self.config.format {
            WireFormat::Json => {
                serde_json::to_vec(value).map_err(|e| CodecError::encode(e.to_string()))
            }
            WireFormat::Cbor => {
                let mut buf = Vec::new();
                ciborium::into_writer(value, &mut buf)
                    .map_err(|e| CodecError::encode(e.to_string()))?;
                Ok(buf)
            }
        }
    }

    /// Decode any value, such as a report embedding [`WireNodeControls`].
    ///
    /// # Errors
    ///
    /// Returns `CodecError::PayloadTooLarge` if the payload exceeds the limit,
    /// `CodecError::UnsupportedGenericCodec` if the target reaches
    /// `NodeControls` through generic serde, and `CodecError::Decode` if the
    /// payload is malformed.
    pub fn decode_value<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let max = self.config.max_payload_bytes;
        if bytes.len() > max {
            tracing::debug!(size = bytes.len(), max, "rejecting oversized payload");
            return Err(CodecError::PayloadTooLarge {
                size: bytes.len(),
                max,
            });
        }

        let decoded = match self.config.format {
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| CodecError::decode(e.to_string()))
            }
            WireFormat::Cbor => {
                ciborium::from_reader(bytes).map_err(|e| CodecError::decode(e.to_string()))
            }
        };
        if let Err(e) = &decoded {
            tracing::debug!(format = %self.config.format, error = %e, "failed to decode payload");
        }
        decoded
    }
}

#[cfg(test)]
mod tests {
    use ciborium::value::Value;

    use super::*;

    fn at(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(secs, nanos)
    }

    fn sample() -> NodeControls {
        NodeControls::new(at(1_700_000_000, 1), ["resume", "pause"].into_iter().collect())
    }

    fn json() -> WireCodec {
        WireCodec::with_format(WireFormat::Json)
    }

    fn cbor() -> WireCodec {
        WireCodec::with_format(WireFormat::Cbor)
    }

    fn cbor_bytes(value: &Value) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).unwrap();
        buf
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn encode_empty_omits_both_fields() {
        let empty = NodeControls::make_empty();
        assert_eq!(json().encode(&empty).unwrap(), b"{}");
        assert_eq!(cbor().encode(&empty).unwrap(), [0xa0_u8]);
    }

    #[test]
    fn encode_json_layout() {
        let encoded = json().encode(&sample()).unwrap();
        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            r#"{"timestamp":"2023-11-14T22:13:20.000000001Z","controls":["pause","resume"]}"#
        );
    }

    #[test]
    fn encode_omits_empty_controls() {
        let only_time = NodeControls::new(at(1_700_000_000, 0), StringSet::new());
        let encoded = json().encode(&only_time).unwrap();
        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            r#"{"timestamp":"2023-11-14T22:13:20.000000000Z"}"#
        );
    }

    #[test]
    fn roundtrip_json_and_cbor() {
        for codec in [json(), cbor()] {
            let encoded = codec.encode(&sample()).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), sample());
        }
    }

    #[test]
    fn decode_empty_payloads_to_unset() {
        let empty = NodeControls::make_empty();
        assert_eq!(json().decode(b"{}").unwrap(), empty);
        assert_eq!(json().decode(b"null").unwrap(), empty);
        assert_eq!(json().decode(b"").unwrap(), empty);
        assert_eq!(cbor().decode(&[0xa0]).unwrap(), empty);
        assert_eq!(cbor().decode(&[0xf6]).unwrap(), empty);
    }

    #[test]
    fn decode_controls_only() {
        let decoded = json().decode(br#"{"controls":["restart"]}"#).unwrap();
        assert!(decoded.is_empty_state());
        assert!(decoded.contains("restart"));
        assert_eq!(decoded.controls().len(), 1);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let payload = br#"{
            "extra": {"nested": [1, 2, {"deep": null}]},
            "controls": ["pause", "resume"],
            "timestamp": "2023-11-14T22:13:20.000000001Z",
            "version": 7
        }"#;
        assert_eq!(json().decode(payload).unwrap(), sample());
    }

    #[test]
    fn decode_cbor_ignores_unknown_fields() {
        let payload = cbor_bytes(&Value::Map(vec![
            (
                text("controls"),
                Value::Array(vec![text("pause"), text("resume")]),
            ),
            (text("agent_version"), Value::Integer(3u8.into())),
            (text("timestamp"), text("2023-11-14T22:13:20.000000001Z")),
        ]));
        assert_eq!(cbor().decode(&payload).unwrap(), sample());
    }

    #[test]
    fn decode_cbor_skips_non_string_keys() {
        let payload = cbor_bytes(&Value::Map(vec![
            (Value::Integer(7u8.into()), text("x")),
            (Value::Integer((-3i8).into()), Value::Bool(true)),
            (Value::Array(vec![text("k")]), Value::Null),
            (Value::Bool(false), Value::Integer(1u8.into())),
            (text("controls"), Value::Array(vec![text("restart")])),
        ]));

        let decoded = cbor().decode(&payload).unwrap();
        assert!(decoded.is_empty_state());
        assert_eq!(decoded.controls().iter().collect::<Vec<_>>(), ["restart"]);
    }

    #[test]
    fn decode_cbor_byte_string_keys() {
        let payload = cbor_bytes(&Value::Map(vec![
            (Value::Bytes(b"controls".to_vec()), Value::Array(vec![text("restart")])),
            (Value::Bytes(vec![0xff, 0x00]), text("ignored")),
        ]));

        assert!(cbor().decode(&payload).unwrap().contains("restart"));
    }

    #[test]
    fn encode_refuses_timestamps_without_rfc3339_form() {
        let last = DateTime::parse_from_rfc3339("9999-12-31T23:59:59.999999999Z")
            .unwrap()
            .with_timezone(&Utc);
        let at_end = NodeControls::new(Some(last), ["a"].into_iter().collect());
        let past_end = NodeControls::new(
            Some(last + chrono::Duration::nanoseconds(1)),
            ["a"].into_iter().collect(),
        );

        for codec in [json(), cbor()] {
            let bytes = codec.encode(&at_end).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), at_end);

            let err = codec.encode(&past_end).unwrap_err();
            assert!(matches!(err, CodecError::Encode(_)), "{err}");
            assert!(!err.is_misuse());
        }
    }

    #[test]
    fn decode_null_fields_as_absent() {
        let decoded = json()
            .decode(br#"{"timestamp":null,"controls":null}"#)
            .unwrap();
        assert_eq!(decoded, NodeControls::make_empty());
    }

    #[test]
    fn decode_empty_timestamp_as_unset() {
        let decoded = json()
            .decode(br#"{"timestamp":"","controls":["restart"]}"#)
            .unwrap();
        assert!(decoded.is_empty_state());
        assert!(decoded.contains("restart"));
    }

    #[test]
    fn decode_rejects_malformed_timestamp() {
        let err = json()
            .decode(br#"{"timestamp":"last tuesday"}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(!err.is_misuse());
    }

    #[test]
    fn decode_rejects_non_map() {
        let err = json().decode(br#"["restart"]"#).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn decode_enforces_payload_limit() {
        let codec = WireCodec::new(CodecConfig {
            format: WireFormat::Json,
            max_payload_bytes: 8,
        });
        let err = codec.decode(br#"{"controls":["restart"]}"#).unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooLarge { max: 8, .. }));
    }

    #[test]
    fn generic_serde_is_refused() {
        let err = serde_json::to_string(&sample()).unwrap_err();
        assert!(err.to_string().contains(GENERIC_CODEC_UNSUPPORTED));

        let err = serde_json::from_str::<NodeControls>("{}").unwrap_err();
        assert!(err.to_string().contains(GENERIC_CODEC_UNSUPPORTED));
    }

    #[test]
    fn generic_serde_is_reported_as_misuse() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Report {
            node: NodeControls,
        }

        for codec in [json(), cbor()] {
            let err = codec.encode_value(&Report { node: sample() }).unwrap_err();
            assert!(err.is_misuse(), "{err}");
        }

        let err = json().decode_value::<Report>(br#"{"node":{}}"#).unwrap_err();
        assert!(err.is_misuse(), "{err}");
    }

    #[test]
    fn serde_with_helpers_use_the_codec() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Report {
            #[serde(with = "crate::wire")]
            node: NodeControls,
        }

        let report = Report { node: sample() };
        for codec in [json(), cbor()] {
            let bytes = codec.encode_value(&report).unwrap();
            assert_eq!(codec.decode_value::<Report>(&bytes).unwrap(), report);
        }
    }

    #[test]
    fn wire_format_parse() {
        assert_eq!("JSON".parse::<WireFormat>().unwrap(), WireFormat::Json);
        assert_eq!("cbor".parse::<WireFormat>().unwrap(), WireFormat::Cbor);
        assert!("msgpack".parse::<WireFormat>().is_err());
    }

    #[test]
    fn codec_config_defaults() {
        let config: CodecConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.format, WireFormat::Json);
        assert_eq!(config.max_payload_bytes, 1024 * 1024);

        let config: CodecConfig = serde_json::from_str(r#"{"format":"cbor"}"#).unwrap();
        assert_eq!(config.format, WireFormat::Cbor);
    }
}
