//! Sentence records as produced by the corpus conversion tools, one JSON
//! object per line.

use super::{
    error::SpanError,
    span::{Adjacency, Span},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SentenceRecord {
    pub tokens: Vec<String>,
    #[serde(default)]
    pub frames: Vec<FrameAnnotation>,
    #[serde(default)]
    pub wsl: Vec<LayerEntry>,
    #[serde(default)]
    pub ner: Vec<LayerEntry>,
    #[serde(default)]
    pub pos: Vec<LayerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameAnnotation {
    pub target: Target,
    #[serde(default, rename = "annotationSets")]
    pub annotation_sets: Option<Vec<AnnotationSet>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    /// Absent when only target identification is evaluated.
    #[serde(default)]
    pub name: Option<String>,
    pub spans: Vec<SpanEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationSet {
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default, rename = "frameElements")]
    pub frame_elements: Vec<FrameElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameElement {
    pub name: String,
    pub spans: Vec<SpanEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpanEntry {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub text: String,
}

/// Entry of a WSL, NER or POS layer.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerEntry {
    pub start: usize,
    pub end: usize,
    pub name: String,
    #[serde(default)]
    pub text: String,
}

fn span_from_entries(entries: &[SpanEntry], adjacency: Adjacency) -> Result<Span, SpanError> {
    let bounds: Vec<usize> = entries.iter().flat_map(|sp| [sp.start, sp.end]).collect();
    Span::with_adjacency(&bounds, adjacency)
}

impl SentenceRecord {
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

impl FrameAnnotation {
    pub fn target_span(&self, adjacency: Adjacency) -> Result<Span, SpanError> {
        span_from_entries(&self.target.spans, adjacency)
    }

    /// Frame elements of the lowest-ranked annotation set. An unranked set
    /// counts as rank 0; ties go to the earliest set.
    pub fn top_frame_elements(&self) -> &[FrameElement] {
        self.annotation_sets
            .iter()
            .flatten()
            .min_by_key(|set| set.rank.unwrap_or(0))
            .map(|set| set.frame_elements.as_slice())
            .unwrap_or_default()
    }
}

impl FrameElement {
    pub fn span(&self, adjacency: Adjacency) -> Result<Span, SpanError> {
        span_from_entries(&self.spans, adjacency)
    }
}

impl LayerEntry {
    pub fn span(&self) -> Result<Span, SpanError> {
        Span::range(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLD: &str = r#"{"tokens": ["The", "barn", "roof", "leaked"],
        "frames": [{"target": {"name": "Building_subparts", "spans": [{"start": 2, "end": 3, "text": "roof"}]},
                    "annotationSets": [{"rank": 0, "frameElements": [{"name": "Whole", "spans": [{"start": 1, "end": 2, "text": "barn"}]}]},
                                       {"rank": 1, "frameElements": []}]}],
        "wsl": [{"start": 0, "end": 1, "name": "NT", "text": "The"}],
        "ner": [],
        "pos": [{"start": 3, "end": 4, "name": "VVD", "text": "leaked"}]}"#;

    #[test]
    fn test_parse_gold_record() {
        let record = SentenceRecord::from_json(GOLD).unwrap();
        assert_eq!(record.tokens.len(), 4);
        assert_eq!(record.frames.len(), 1);
        let frame = &record.frames[0];
        assert_eq!(frame.target.name.as_deref(), Some("Building_subparts"));
        assert_eq!(
            frame.target_span(Adjacency::Keep).unwrap(),
            Span::range(2, 3).unwrap()
        );
        let elements = frame.top_frame_elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].name, "Whole");
        assert_eq!(record.wsl[0].span().unwrap(), Span::range(0, 1).unwrap());
    }

    #[test]
    fn test_parse_target_only_prediction() {
        let line = r#"{"tokens": ["a", "b"], "frames": [{"target": {"spans": [{"start": 0, "end": 1}]}}]}"#;
        let record = SentenceRecord::from_json(line).unwrap();
        let frame = &record.frames[0];
        assert!(frame.target.name.is_none());
        assert!(frame.top_frame_elements().is_empty());
        assert!(record.wsl.is_empty() && record.ner.is_empty() && record.pos.is_empty());
    }

    #[test]
    fn test_parse_null_name_and_empty_sets() {
        let line = r#"{"tokens": ["a"], "frames": [{"target": {"name": null, "spans": [{"start": 0, "end": 1}]}, "annotationSets": []}]}"#;
        let record = SentenceRecord::from_json(line).unwrap();
        assert!(record.frames[0].target.name.is_none());
        assert!(record.frames[0].top_frame_elements().is_empty());
    }

    #[test]
    fn test_top_frame_elements_follow_rank() {
        let line = r#"{"tokens": ["a", "b"], "frames": [{"target": {"name": "X", "spans": [{"start": 0, "end": 1}]},
            "annotationSets": [{"rank": 1, "frameElements": [{"name": "Second", "spans": [{"start": 1, "end": 2}]}]},
                               {"rank": 0, "frameElements": [{"name": "First", "spans": [{"start": 1, "end": 2}]}]}]}]}"#;
        let record = SentenceRecord::from_json(line).unwrap();
        let elements = record.frames[0].top_frame_elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].name, "First");
    }

    #[test]
    fn test_parse_missing_tokens_err() {
        assert!(SentenceRecord::from_json(r#"{"frames": []}"#).is_err());
    }
}
