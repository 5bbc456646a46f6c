//! Field paths into a manifest tree
//!
//! A path is a dotted list of keys where `[*]` fans out over an array:
//! `spec.template.spec.containers[*].image`. Missing keys, non-object
//! parents and non-array fan-outs simply address nothing.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Each,
}

/// Parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        for part in raw.split('.').filter(|p| !p.is_empty()) {
            let mut key = part;
            let mut fan_outs = 0;
            while let Some(stripped) = key.strip_suffix("[*]") {
                key = stripped;
                fan_outs += 1;
            }
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }
            segments.extend(std::iter::repeat_n(Segment::Each, fan_outs));
        }
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Every value the path addresses, in document order
    pub fn values<'a>(&self, root: &'a Map<String, Value>) -> Vec<&'a Value> {
        let mut out = Vec::new();
        if let Some((Segment::Key(first), rest)) = self.segments.split_first() {
            if let Some(value) = root.get(first) {
                collect(value, rest, &mut out);
            }
        }
        out
    }

    /// Visit every addressed value mutably, in document order
    pub fn visit_mut(&self, root: &mut Map<String, Value>, f: &mut dyn FnMut(&mut Value)) {
        if let Some((Segment::Key(first), rest)) = self.segments.split_first() {
            if let Some(value) = root.get_mut(first) {
                visit(value, rest, f);
            }
        }
    }
}

fn collect<'a>(value: &'a Value, segments: &[Segment], out: &mut Vec<&'a Value>) {
    match segments.split_first() {
        None => out.push(value),
        Some((Segment::Key(key), rest)) => {
            if let Some(child) = value.get(key) {
                collect(child, rest, out);
            }
        }
        Some((Segment::Each, rest)) => {
            if let Some(items) = value.as_array() {
                for item in items {
                    collect(item, rest, out);
                }
            }
        }
    }
}

fn visit(value: &mut Value, segments: &[Segment], f: &mut dyn FnMut(&mut Value)) {
    match segments.split_first() {
        None => f(value),
        Some((Segment::Key(key), rest)) => {
            if let Some(child) = value.get_mut(key) {
                visit(child, rest, f);
            }
        }
        Some((Segment::Each, rest)) => {
            if let Some(items) = value.as_array_mut() {
                for item in items {
                    visit(item, rest, f);
                }
            }
        }
    }
}
