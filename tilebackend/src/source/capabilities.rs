//! Source metadata and the capabilities derived from it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::coord::MAX_ZOOM;

/// Minimum zoom assumed when a source does not declare one.
pub const DEFAULT_MINZOOM: u8 = 0;

/// Maximum zoom assumed when a source does not declare one.
pub const DEFAULT_MAXZOOM: u8 = 22;

/// How a source degrades when its primary tile cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DegradedResolutionPolicy {
    /// No fallback; absence yields an empty tile.
    #[default]
    None,
    /// Retry at this zoom when the primary tile does not exist.
    Fillzoom(u8),
    /// Redraw at this zoom when resolving or drawing the primary tile fails.
    MaskLevel(u8),
}

/// Kind of data a source serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceKind {
    /// Vector tiles; coarse tiles may be stretched to deeper zooms.
    #[default]
    Vector,
    /// Raster tiles; coarse tiles are never stretched.
    Raster,
}

/// What the resolver needs to know about a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCapabilities {
    pub minzoom: u8,
    pub maxzoom: u8,
    pub policy: DegradedResolutionPolicy,
    pub kind: SourceKind,
}

impl SourceCapabilities {
    /// Vector source with the given zoom range and no degraded policy.
    pub fn new(minzoom: u8, maxzoom: u8) -> Self {
        Self {
            minzoom,
            maxzoom,
            policy: DegradedResolutionPolicy::None,
            kind: SourceKind::Vector,
        }
    }

    /// Set the degraded-resolution policy.
    pub fn with_policy(mut self, policy: DegradedResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the source kind.
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Derive capabilities from a metadata document.
    ///
    /// Missing zooms fall back to [`DEFAULT_MINZOOM`]/[`DEFAULT_MAXZOOM`]. A
    /// source without vector layers is treated as raster. When both
    /// `fillzoom` and `maskLevel` are declared, `fillzoom` wins.
    pub fn from_info(info: &SourceInfo) -> Self {
        let maxzoom = info.maxzoom.unwrap_or(DEFAULT_MAXZOOM);
        let minzoom = info.minzoom.unwrap_or(DEFAULT_MINZOOM).min(maxzoom);

        let policy = match (info.fillzoom, info.mask_level) {
            (Some(fillzoom), Some(mask_level)) => {
                warn!(
                    fillzoom,
                    mask_level, "Source declares both fillzoom and maskLevel, using fillzoom"
                );
                DegradedResolutionPolicy::Fillzoom(fillzoom)
            }
            (Some(fillzoom), None) => DegradedResolutionPolicy::Fillzoom(fillzoom),
            (None, Some(mask_level)) => DegradedResolutionPolicy::MaskLevel(mask_level),
            (None, None) => DegradedResolutionPolicy::None,
        };

        let kind = if info.vector_layers.is_empty() {
            SourceKind::Raster
        } else {
            SourceKind::Vector
        };

        Self {
            minzoom,
            maxzoom,
            policy,
            kind,
        }
    }
}

impl Default for SourceCapabilities {
    fn default() -> Self {
        Self::new(DEFAULT_MINZOOM, DEFAULT_MAXZOOM)
    }
}

/// TileJSON-style metadata document describing a source.
///
/// Unknown keys are kept in `extra` so the document can be passed on
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_zoom",
        skip_serializing_if = "Option::is_none"
    )]
    pub minzoom: Option<u8>,

    #[serde(
        default,
        deserialize_with = "lenient_zoom",
        skip_serializing_if = "Option::is_none"
    )]
    pub maxzoom: Option<u8>,

    #[serde(
        default,
        deserialize_with = "lenient_zoom",
        skip_serializing_if = "Option::is_none"
    )]
    pub fillzoom: Option<u8>,

    #[serde(
        default,
        rename = "maskLevel",
        deserialize_with = "lenient_zoom",
        skip_serializing_if = "Option::is_none"
    )]
    pub mask_level: Option<u8>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector_layers: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceInfo {
    /// Metadata with an explicit zoom range and nothing else.
    pub fn new(minzoom: u8, maxzoom: u8) -> Self {
        Self {
            minzoom: Some(minzoom),
            maxzoom: Some(maxzoom),
            ..Self::default()
        }
    }

    /// Add a vector layer by id.
    pub fn with_vector_layer(mut self, id: &str) -> Self {
        self.vector_layers.push(serde_json::json!({ "id": id }));
        self
    }

    /// Declare a fillzoom.
    pub fn with_fillzoom(mut self, fillzoom: u8) -> Self {
        self.fillzoom = Some(fillzoom);
        self
    }

    /// Declare a mask level.
    pub fn with_mask_level(mut self, mask_level: u8) -> Self {
        self.mask_level = Some(mask_level);
        self
    }

    /// Parse a JSON metadata document.
    pub fn from_json(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }
}

/// Accept zooms as numbers or numeric strings.
///
/// Strings use leading-integer parsing (`"8px"` is 8); anything that does not
/// yield a zoom in `0..=MAX_ZOOM` is treated as absent.
fn lenient_zoom<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_zoom))
}

fn parse_zoom(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))?,
        Value::String(s) => {
            let digits: String = s
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u64>().ok()?
        }
        _ => return None,
    };
    u8::try_from(raw).ok().filter(|z| *z <= MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_metadata() {
        let caps = SourceCapabilities::from_info(&SourceInfo::default());

        assert_eq!(caps.minzoom, 0);
        assert_eq!(caps.maxzoom, 22);
        assert_eq!(caps.policy, DegradedResolutionPolicy::None);
        assert_eq!(caps.kind, SourceKind::Raster);
    }

    #[test]
    fn test_vector_layers_make_vector_source() {
        let info = SourceInfo::new(0, 2).with_vector_layer("water");
        let caps = SourceCapabilities::from_info(&info);

        assert_eq!(caps.kind, SourceKind::Vector);
        assert_eq!(caps.maxzoom, 2);
    }

    #[test]
    fn test_fillzoom_wins_over_mask_level() {
        let info = SourceInfo::new(0, 10).with_fillzoom(4).with_mask_level(6);
        let caps = SourceCapabilities::from_info(&info);

        assert_eq!(caps.policy, DegradedResolutionPolicy::Fillzoom(4));
    }

    #[test]
    fn test_mask_level_policy() {
        let info = SourceInfo::new(0, 10).with_mask_level(6);
        let caps = SourceCapabilities::from_info(&info);

        assert_eq!(caps.policy, DegradedResolutionPolicy::MaskLevel(6));
    }

    #[test]
    fn test_minzoom_never_exceeds_maxzoom() {
        let caps = SourceCapabilities::from_info(&SourceInfo::new(8, 4));
        assert_eq!(caps.minzoom, 4);
    }

    #[test]
    fn test_parse_tilejson() {
        let json = br#"{
            "name": "streets",
            "minzoom": 0,
            "maxzoom": 14,
            "fillzoom": "3",
            "maskLevel": 8,
            "vector_layers": [{"id": "roads"}],
            "attribution": "somebody"
        }"#;
        let info = SourceInfo::from_json(json).unwrap();

        assert_eq!(info.name.as_deref(), Some("streets"));
        assert_eq!(info.maxzoom, Some(14));
        assert_eq!(info.fillzoom, Some(3));
        assert_eq!(info.mask_level, Some(8));
        assert_eq!(info.vector_layers.len(), 1);
        assert_eq!(
            info.extra.get("attribution"),
            Some(&Value::String("somebody".to_string()))
        );
    }

    #[test]
    fn test_lenient_zoom_parsing() {
        assert_eq!(parse_zoom(&serde_json::json!(5)), Some(5));
        assert_eq!(parse_zoom(&serde_json::json!(5.7)), Some(5));
        assert_eq!(parse_zoom(&serde_json::json!("12abc")), Some(12));
        assert_eq!(parse_zoom(&serde_json::json!(" 7")), Some(7));
        assert_eq!(parse_zoom(&serde_json::json!("abc")), None);
        assert_eq!(parse_zoom(&serde_json::json!(-1)), None);
        assert_eq!(parse_zoom(&serde_json::json!(40)), None);
        assert_eq!(parse_zoom(&serde_json::json!(true)), None);
        assert_eq!(parse_zoom(&Value::Null), None);
    }

    #[test]
    fn test_null_fillzoom_is_absent() {
        let info = SourceInfo::from_json(br#"{"fillzoom": null}"#).unwrap();
        assert_eq!(info.fillzoom, None);
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let json = serde_json::to_value(SourceInfo::new(0, 3)).unwrap();

        assert_eq!(json, serde_json::json!({ "minzoom": 0, "maxzoom": 3 }));
    }
}
