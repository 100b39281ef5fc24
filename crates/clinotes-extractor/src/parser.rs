//! Parse model output into schema fields
//!
//! Parsing never fails: output that matches no strategy becomes a
//! `parse_failure` result with the raw text kept for diagnostics.

use clinotes_domain::{
    ExtractionResult, FailureKind, FieldSchema, FieldValue, FieldValues, NoteId, SchemaField,
    FIELD_COUNT,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Keys models commonly wrap the record in
const WRAPPER_KEYS: &[&str] = &["results", "features", "data", "notes", "extracted_features"];

/// Labels longer than this are treated as prose, not headings
const MAX_LABEL_CHARS: usize = 60;

/// Ways of reading fields out of model output, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// A JSON object, possibly fenced, wrapped or surrounded by prose
    StructuredJson,
    /// `Label: value` lines
    LabeledLines,
}

impl ParseStrategy {
    /// Strategies in the order they are tried
    pub const ORDER: [ParseStrategy; 2] = [ParseStrategy::StructuredJson, ParseStrategy::LabeledLines];

    /// Name for logs
    pub fn name(self) -> &'static str {
        match self {
            ParseStrategy::StructuredJson => "structured_json",
            ParseStrategy::LabeledLines => "labeled_lines",
        }
    }

    /// Field values if at least one schema field was recognized
    pub fn apply(self, raw: &str, schema: &FieldSchema) -> Option<FieldValues> {
        match self {
            ParseStrategy::StructuredJson => parse_structured(raw, schema),
            ParseStrategy::LabeledLines => parse_labeled(raw, schema),
        }
    }
}

/// Parse model output into an extraction result
///
/// # Examples
///
/// ```
/// use clinotes_domain::{FieldSchema, NoteId, SchemaField};
/// use clinotes_extractor::parse_response;
///
/// let raw = "```json\n{\"Chief_Complaint\": \"cough\", \"Plan\": \"\"}\n```";
/// let result = parse_response(NoteId::new("1"), raw, FieldSchema::clinical());
/// assert!(result.is_success());
/// assert_eq!(result.value(SchemaField::ChiefComplaint).as_str(), Some("cough"));
/// assert!(result.value(SchemaField::Plan).is_missing());
/// ```
pub fn parse_response(note_id: NoteId, raw: &str, schema: &FieldSchema) -> ExtractionResult {
    for strategy in ParseStrategy::ORDER {
        if let Some(values) = strategy.apply(raw, schema) {
            debug!(
                note_id = %note_id,
                strategy = strategy.name(),
                populated = values.populated_count(),
                "Parsed model response"
            );
            return ExtractionResult::succeeded(note_id, values, Some(raw.to_string()));
        }
    }

    warn!(note_id = %note_id, chars = raw.len(), "Model response contained no schema fields");
    ExtractionResult::failed(
        note_id,
        FailureKind::ParseFailure,
        "response contained no recognizable schema fields",
        Some(raw.to_string()),
    )
}

/// Tracks the first occurrence of each field
struct Collector {
    values: FieldValues,
    seen: [bool; FIELD_COUNT],
    matched: bool,
}

impl Collector {
    fn new() -> Self {
        Self {
            values: FieldValues::all_missing(),
            seen: [false; FIELD_COUNT],
            matched: false,
        }
    }

    fn finish(self) -> Option<FieldValues> {
        self.matched.then_some(self.values)
    }
}

// ---- Structured JSON ----

fn parse_structured(raw: &str, schema: &FieldSchema) -> Option<FieldValues> {
    let text = strip_code_fences(raw);
    let value = serde_json::from_str::<Value>(text)
        .ok()
        .or_else(|| outermost_json(text))?;
    let record = unwrap_record(&value, schema)?;

    let mut collector = Collector::new();
    for (key, value) in record {
        let Some(field) = schema.match_label(key) else {
            debug!(key = %key, "Discarding unrecognized key");
            continue;
        };
        collector.matched = true;
        if collector.seen[field.index()] {
            continue;
        }
        collector.seen[field.index()] = true;
        collector.values.set(field, json_field_value(value));
    }
    collector.finish()
}

/// Body of the first Markdown code fence, or the trimmed text
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    // Skip the language tag
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(after.len());
    let body = &after[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// The outermost `{...}` or `[...]` span that parses as JSON
fn outermost_json(text: &str) -> Option<Value> {
    [('{', '}'), ('[', ']')].into_iter().find_map(|(open, close)| {
        let start = text.find(open)?;
        let end = text.rfind(close)?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&text[start..=end]).ok()
    })
}

/// The object holding the fields
///
/// A map with at least one schema key wins over anything nested in it;
/// wrappers and arrays are searched only when the map itself has none.
fn unwrap_record<'v>(value: &'v Value, schema: &FieldSchema) -> Option<&'v Map<String, Value>> {
    match value {
        Value::Object(map) => {
            if map.keys().any(|key| schema.match_label(key).is_some()) {
                return Some(map);
            }
            WRAPPER_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(|inner| unwrap_record(inner, schema)))
        }
        Value::Array(items) => items.iter().find_map(|item| unwrap_record(item, schema)),
        _ => None,
    }
}

fn json_field_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Missing,
        Value::String(text) => FieldValue::from_raw(text),
        other => FieldValue::from_raw(&render_json(other)),
    }
}

/// Flatten a JSON value into field text
fn render_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_json)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k, render_json(v)))
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

// ---- Labeled lines ----

fn parse_labeled(raw: &str, schema: &FieldSchema) -> Option<FieldValues> {
    let mut collector = Collector::new();
    let mut buffers: [Option<String>; FIELD_COUNT] = Default::default();
    let mut current = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // Unlabeled text after a blank line is commentary
            current = None;
            continue;
        }

        if let Some((field, value)) = split_label(trimmed, schema) {
            collector.matched = true;
            if collector.seen[field.index()] {
                current = None;
                continue;
            }
            collector.seen[field.index()] = true;
            buffers[field.index()] = Some(value.to_string());
            current = Some(field);
            continue;
        }

        if let Some(field) = current {
            let buffer = buffers[field.index()].get_or_insert_with(String::new);
            let (is_item, text) = strip_list_marker(trimmed);
            if !buffer.is_empty() {
                buffer.push_str(if is_item { "; " } else { " " });
            }
            buffer.push_str(text);
        }
    }

    for (field, buffer) in SchemaField::ALL.into_iter().zip(buffers) {
        if let Some(text) = buffer {
            collector.values.set(field, FieldValue::from_raw(&text));
        }
    }
    collector.finish()
}

/// Recognize `Label: value`, returning the field and the cleaned value
fn split_label<'a>(line: &'a str, schema: &FieldSchema) -> Option<(SchemaField, &'a str)> {
    let (_, line) = strip_list_marker(line);
    let line = line.trim_start_matches('#').trim_start();
    let (label, value) = line.split_once(':')?;
    if label.trim().is_empty() || label.chars().count() > MAX_LABEL_CHARS {
        return None;
    }
    let field = schema.match_label(label)?;
    Some((field, clean_value(value)))
}

/// Drop a leading bullet or number; reports whether one was present
fn strip_list_marker(line: &str) -> (bool, &str) {
    let stripped = line.trim_start_matches(&['-', '*', '•'][..]).trim_start();
    if stripped.len() != line.len() {
        return (true, stripped);
    }

    let digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if digits.len() != line.len() {
        if let Some(rest) = digits.strip_prefix('.').or_else(|| digits.strip_prefix(')')) {
            // "3.5 mg" is a value, "3. item" is a list entry
            if rest.starts_with(char::is_whitespace) {
                return (true, rest.trim_start());
            }
        }
    }
    (false, line)
}

/// Remove emphasis and JSON-ish punctuation around a value
fn clean_value(value: &str) -> &str {
    let value = value.trim().trim_start_matches('*').trim();
    let value = value.strip_suffix(',').unwrap_or(value).trim();
    value.trim_matches('"').trim()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: parsing the same text twice gives the same result
        #[test]
        fn test_parse_is_deterministic(raw in ".{0,400}") {
            let schema = FieldSchema::clinical();
            let a = parse_response(NoteId::new("n"), &raw, schema);
            let b = parse_response(NoteId::new("n"), &raw, schema);
            prop_assert_eq!(a, b);
        }

        /// Property: every result carries exactly the schema fields, all missing on failure
        #[test]
        fn test_field_set_is_fixed(raw in ".{0,400}") {
            let result = parse_response(NoteId::new("n"), &raw, FieldSchema::clinical());
            let fields: Vec<_> = result.fields().iter().map(|(f, _)| f).collect();
            prop_assert_eq!(fields, SchemaField::ALL.to_vec());
            if !result.is_success() {
                prop_assert!(result.fields().is_all_missing());
            }
        }

        /// Property: a canonical JSON object is read back field by field
        #[test]
        fn test_canonical_json_read_back(
            values in prop::collection::vec(prop::option::of("[a-zA-Z0-9][a-zA-Z0-9 ;]{0,20}[a-zA-Z0-9]"), FIELD_COUNT)
        ) {
            let mut object = Map::new();
            for (field, value) in SchemaField::ALL.into_iter().zip(&values) {
                object.insert(field.key().to_string(), Value::String(value.clone().unwrap_or_default()));
            }
            let raw = Value::Object(object).to_string();
            let result = parse_response(NoteId::new("n"), &raw, FieldSchema::clinical());
            prop_assert!(result.is_success());
            for (field, value) in SchemaField::ALL.into_iter().zip(&values) {
                prop_assert_eq!(result.value(field).as_str(), value.as_deref());
            }
        }
    }
}
