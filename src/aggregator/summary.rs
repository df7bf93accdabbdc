//! Summary document types.
//!
//! A summary is a nested, ordered mapping. Internal nodes are keyed
//! `"[<counter>] <id>"` and map to their children; leaves are keyed by bare
//! id and map to their counter; a `"skipped"` entry holds the total of
//! children pruned for being below the 1% threshold. Entry order is part of
//! the output (children sorted by descending counter), so the map is an
//! ordered list with hand-written serde impls.

use crate::utils::config::{BOTTOM_UP_ROOT, SKIPPED_KEY, TOP_DOWN_ROOT};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Key of an internal node: `"[<counter>] <id>"`
pub fn count_key(counter: u64, id: &str) -> String {
    format!("[{}] {}", counter, id)
}

/// Split an internal-node key back into counter and id
pub fn parse_count_key(key: &str) -> Option<(u64, &str)> {
    let rest = key.strip_prefix('[')?;
    let (count, id) = rest.split_once("] ")?;
    Some((count.parse().ok()?, id))
}

/// Value of one summary entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryValue {
    /// Leaf counter, or the `skipped` total
    Count(u64),
    /// Children of an internal node
    Node(SummaryMap),
}

/// Ordered mapping from keys to summary values
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummaryMap {
    entries: Vec<(String, SummaryValue)>,
}

impl SummaryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping insertion order
    pub fn insert(&mut self, key: impl Into<String>, value: SummaryValue) {
        self.entries.push((key.into(), value));
    }

    /// Append all entries of `other`
    pub fn extend(&mut self, other: SummaryMap) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, key: &str) -> Option<&SummaryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Pruned total at this level, if any child was collapsed
    pub fn skipped(&self) -> Option<u64> {
        match self.get(SKIPPED_KEY) {
            Some(SummaryValue::Count(n)) => Some(*n),
            _ => None,
        }
    }

    /// Find the entry for node `id`, whether emitted as leaf or internal
    ///
    /// Returns the node's counter and its children (None for leaves).
    pub fn find_node(&self, id: &str) -> Option<(u64, Option<&SummaryMap>)> {
        self.entries.iter().find_map(|(key, value)| match value {
            SummaryValue::Count(n) if key == id => Some((*n, None)),
            SummaryValue::Node(children) => match parse_count_key(key) {
                Some((n, node_id)) if node_id == id => Some((n, Some(children))),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SummaryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SummaryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SummaryValue::Count(n) => serializer.serialize_u64(*n),
            SummaryValue::Node(map) => map.serialize(serializer),
        }
    }
}

impl Serialize for SummaryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct SummaryMapVisitor;

impl<'de> Visitor<'de> for SummaryMapVisitor {
    type Value = SummaryMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a call-tree summary object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = SummaryMap::new();
        while let Some((key, value)) = access.next_entry::<String, SummaryValue>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for SummaryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SummaryMapVisitor)
    }
}

struct SummaryValueVisitor;

impl<'de> Visitor<'de> for SummaryValueVisitor {
    type Value = SummaryValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sample count or a nested summary object")
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
        Ok(SummaryValue::Count(n))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
        u64::try_from(n)
            .map(SummaryValue::Count)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(n), &self))
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        SummaryMapVisitor.visit_map(access).map(SummaryValue::Node)
    }
}

impl<'de> Deserialize<'de> for SummaryValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SummaryValueVisitor)
    }
}

/// Combined summary of the top-down and bottom-up trees
///
/// Serializes as one object holding both roots:
/// `{ "[N] topDown": {...}, "[N] bottomUp": {...} }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TraceSummary {
    roots: SummaryMap,
}

impl TraceSummary {
    /// Merge the two per-tree summaries
    pub fn new(top_down: SummaryMap, bottom_up: SummaryMap) -> Self {
        let mut roots = top_down;
        roots.extend(bottom_up);
        Self { roots }
    }

    /// Wrap a deserialized document, checking that both roots are present
    pub fn from_map(roots: SummaryMap) -> Result<Self, String> {
        for root in [TOP_DOWN_ROOT, BOTTOM_UP_ROOT] {
            if roots.find_node(root).is_none() {
                return Err(format!("missing \"{}\" root", root));
            }
        }
        Ok(Self { roots })
    }

    /// Both roots as one mapping
    pub fn roots(&self) -> &SummaryMap {
        &self.roots
    }

    /// Sample count of the top-down root
    pub fn top_down_samples(&self) -> u64 {
        self.roots.find_node(TOP_DOWN_ROOT).map_or(0, |(n, _)| n)
    }

    /// Sample count of the bottom-up root
    pub fn bottom_up_samples(&self) -> u64 {
        self.roots.find_node(BOTTOM_UP_ROOT).map_or(0, |(n, _)| n)
    }

    /// Children of the top-down root (None when no trace was folded)
    pub fn top_down(&self) -> Option<&SummaryMap> {
        self.roots.find_node(TOP_DOWN_ROOT).and_then(|(_, c)| c)
    }

    /// Children of the bottom-up root (None when no trace was folded)
    pub fn bottom_up(&self) -> Option<&SummaryMap> {
        self.roots.find_node(BOTTOM_UP_ROOT).and_then(|(_, c)| c)
    }

    /// Indented JSON text
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Indented plain-text tree
    pub fn render_text(&self) -> String {
        crate::output::text::render_summary(self)
    }
}

impl<'de> Deserialize<'de> for TraceSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let roots = SummaryMap::deserialize(deserializer)?;
        TraceSummary::from_map(roots).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_map() -> SummaryMap {
        let mut inner = SummaryMap::new();
        inner.insert("b", SummaryValue::Count(2));
        inner.insert("c", SummaryValue::Count(1));
        let mut map = SummaryMap::new();
        map.insert(count_key(3, "a"), SummaryValue::Node(inner));
        map
    }

    #[test]
    fn test_count_key_round_trip() {
        assert_eq!(count_key(12, "main (src/main.rs:3)"), "[12] main (src/main.rs:3)");
        assert_eq!(parse_count_key("[12] main (src/main.rs:3)"), Some((12, "main (src/main.rs:3)")));
        assert_eq!(parse_count_key("main"), None);
        assert_eq!(parse_count_key("[x] main"), None);
    }

    #[test]
    fn test_serialization_preserves_order() {
        let json = serde_json::to_string(&sample_map()).unwrap();
        assert_eq!(json, r#"{"[3] a":{"b":2,"c":1}}"#);
    }

    #[test]
    fn test_deserialize_preserves_order() {
        let map: SummaryMap =
            serde_json::from_str(r#"{"[9] z":{"y":5,"x":3,"skipped":1}}"#).unwrap();
        let (count, children) = map.find_node("z").unwrap();
        let children = children.unwrap();

        assert_eq!(count, 9);
        assert_eq!(children.keys().collect::<Vec<_>>(), vec!["y", "x", "skipped"]);
        assert_eq!(children.skipped(), Some(1));
    }

    #[test]
    fn test_negative_count_rejected() {
        let result: Result<SummaryMap, _> = serde_json::from_str(r#"{"a":-1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_trace_summary_roots() {
        let mut top = SummaryMap::new();
        top.insert(count_key(3, TOP_DOWN_ROOT), SummaryValue::Node(sample_map()));
        let mut bottom = SummaryMap::new();
        bottom.insert(BOTTOM_UP_ROOT, SummaryValue::Count(0));

        let summary = TraceSummary::new(top, bottom);
        assert_eq!(summary.top_down_samples(), 3);
        assert_eq!(summary.bottom_up_samples(), 0);
        assert!(summary.top_down().is_some());
        assert!(summary.bottom_up().is_none());

        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"[3] topDown":{"[3] a":{"b":2,"c":1}},"bottomUp":0}"#);

        let back: TraceSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn test_missing_root_rejected() {
        let result: Result<TraceSummary, _> = serde_json::from_str(r#"{"topDown":0}"#);
        assert!(result.is_err());
    }
}
