use std::collections::HashMap;

use tracing::{debug, warn};

use super::tree::{AnnotationRow, Node};

const URN_SCHEME: &str = "urn:";
const PRIMARY_SEPARATOR: &str = "::";
const SECONDARY_SEPARATOR: char = '$';
/// Marks the stack boundary inside a resource URN.
pub const STACK_SENTINEL: &str = "::pulumi:pulumi:Stack";
/// Operation tag of a resource the plan leaves untouched.
pub const UNCHANGED_OP: &str = "same";

/// One resource step of a plan, reduced to what the tree needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    pub path: String,
    pub op: String,
    pub diff_reasons: Vec<String>,
}

impl ResourceChange {
    pub fn new(path: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            op: op.into(),
            diff_reasons: Vec::new(),
        }
    }

    pub fn with_diff_reasons<I, S>(mut self, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.diff_reasons = reasons.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_unchanged(&self) -> bool {
        self.op == UNCHANGED_OP
    }

    fn annotation_row(&self, name: &str) -> AnnotationRow {
        let mut fields = vec![name.to_string(), self.op.clone()];
        if !self.diff_reasons.is_empty() {
            fields.push(format!("[diff: {}]", self.diff_reasons.join(", ")));
        }
        AnnotationRow::new(fields)
    }
}

/// Where the stack prefix stripped from every path comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixSource {
    Explicit(String),
    Detect,
}

impl PrefixSource {
    pub fn resolve(&self, records: &[ResourceChange]) -> String {
        match self {
            PrefixSource::Explicit(prefix) => prefix.clone(),
            PrefixSource::Detect => detect_prefix(records).unwrap_or_else(|| {
                warn!(
                    "No path contains '{}', building the tree without a prefix",
                    STACK_SENTINEL
                );
                String::new()
            }),
        }
    }
}

/// Scans every record, unchanged ones included, for the stack boundary.
pub fn detect_prefix(records: &[ResourceChange]) -> Option<String> {
    records.iter().find_map(|record| {
        let idx = record.path.find(STACK_SENTINEL)?;
        let before = &record.path[..idx];
        Some(before.strip_prefix(URN_SCHEME).unwrap_or(before).to_string())
    })
}

/// Splits a raw path into display segments once the prefix is removed.
pub fn path_segments(prefix: &str, path: &str) -> Vec<String> {
    let stripped = path.strip_prefix(URN_SCHEME).unwrap_or(path);
    let stripped = stripped.strip_prefix(prefix).unwrap_or(stripped);
    let stripped = stripped.strip_prefix(PRIMARY_SEPARATOR).unwrap_or(stripped);
    if stripped.is_empty() {
        return Vec::new();
    }

    stripped
        .split(PRIMARY_SEPARATOR)
        .flat_map(|part| part.split(SECONDARY_SEPARATOR))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
enum Slot {
    Node(Vec<usize>),
    Leaf,
}

/// Folds resource changes into a tree rooted at the stack prefix.
///
/// The last segment of a path is a leaf key: it becomes an annotation row on
/// its parent and never a node. Insertion is order dependent, so `a::b`
/// followed by `a::b::c` skips `c` with a warning, while `a::b::c` followed by
/// `a::b` keeps `b` as a node annotated with `c`.
pub struct TreeBuilder {
    prefix: PrefixSource,
}

impl TreeBuilder {
    pub fn new(prefix: PrefixSource) -> Self {
        Self { prefix }
    }

    pub fn explicit(prefix: impl Into<String>) -> Self {
        Self::new(PrefixSource::Explicit(prefix.into()))
    }

    pub fn detect() -> Self {
        Self::new(PrefixSource::Detect)
    }

    pub fn build(&self, records: &[ResourceChange]) -> Node {
        let prefix = self.prefix.resolve(records);
        debug!("Building change tree with prefix '{}'", prefix);

        let mut root = Node::new(prefix.as_str());
        let mut slots = HashMap::from([(String::new(), Slot::Node(Vec::new()))]);

        for record in records {
            if record.is_unchanged() {
                continue;
            }
            let segments = path_segments(&prefix, &record.path);
            if segments.is_empty() {
                debug!("Skipping record with empty path: {}", record.path);
                continue;
            }
            Self::insert(&mut root, &mut slots, record, &segments);
        }

        root
    }

    fn insert(
        root: &mut Node,
        slots: &mut HashMap<String, Slot>,
        record: &ResourceChange,
        segments: &[String],
    ) {
        let depth = segments.len();
        for i in 1..=depth {
            let key = segments[..i].join(PRIMARY_SEPARATOR);
            if slots.contains_key(&key) {
                continue;
            }

            let parent_key = segments[..i - 1].join(PRIMARY_SEPARATOR);
            let parent_indices = match slots.get(&parent_key) {
                Some(Slot::Node(indices)) => indices.clone(),
                _ => {
                    warn!("Missing parent for {}, skipping {}", key, record.path);
                    return;
                }
            };
            let Some(parent) = root.descendant_mut(&parent_indices) else {
                warn!("Dangling parent for {}, skipping {}", key, record.path);
                return;
            };

            let segment = &segments[i - 1];
            if i == depth && depth > 1 {
                parent.annotate(record.annotation_row(segment));
                slots.insert(key, Slot::Leaf);
                continue;
            }

            let child_index = parent.children().len();
            let child = parent.add_child(segment.as_str());
            if i == depth {
                child.annotate(record.annotation_row(""));
            }
            let mut indices = parent_indices;
            indices.push(child_index);
            slots.insert(key, Slot::Node(indices));
        }
    }
}
