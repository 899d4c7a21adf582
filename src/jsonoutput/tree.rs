use derive_more::{Deref, From};

const NEW_LINE: char = '\n';
const EMPTY_SPACE: &str = "   ";
const MIDDLE_ITEM: &str = "├─ ";
const CONTINUE_ITEM: &str = "│  ";
const LAST_ITEM: &str = "└─ ";

/// Width in characters of every indentation glyph above.
const GLYPH_WIDTH: usize = 3;
/// Fixed width of the first annotation column.
pub const FIRST_COLUMN_WIDTH: usize = 20;
/// Gap between the widest label line and the first annotation column.
pub const COLUMN_GAP: usize = 2;
const FIELD_SEPARATOR: &str = "  ";
const MAX_FIELDS: usize = 3;

/// Up to three side-by-side display fields printed after a node's label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deref, From)]
pub struct AnnotationRow(Vec<String>);

impl AnnotationRow {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().take(MAX_FIELDS).map(Into::into).collect())
    }

    fn format(&self) -> String {
        let mut fields = self.0.iter();
        let mut res = truncate_or_pad(fields.next().map_or("", String::as_str), FIRST_COLUMN_WIDTH);
        for field in fields.filter(|f| !f.is_empty()) {
            res.push_str(FIELD_SEPARATOR);
            res.push_str(field);
        }
        res
    }
}

/// A vertex of the change tree. Children keep first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    label: String,
    annotations: Vec<AnnotationRow>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            annotations: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn annotations(&self) -> &[AnnotationRow] {
        &self.annotations
    }

    pub fn add_child(&mut self, label: impl Into<String>) -> &mut Node {
        self.children.push(Node::new(label));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn annotate(&mut self, row: AnnotationRow) {
        self.annotations.push(row);
    }

    /// Follows a path of child indices down from this node.
    pub fn descendant_mut(&mut self, indices: &[usize]) -> Option<&mut Node> {
        indices
            .iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    /// Renders the tree, aligning annotation columns when `include_columns` is set.
    pub fn print(&self, include_columns: bool) -> String {
        let col_start = include_columns.then(|| measure(self) + COLUMN_GAP);
        render_with(self, col_start)
    }

    /// The node's own text block. `depth` is the number of glyphs printed before it.
    fn text(&self, depth: usize, col_start: Option<usize>) -> String {
        let Some(col_start) = col_start else {
            return self.label.clone();
        };
        let Some((first, rest)) = self.annotations.split_first() else {
            return self.label.clone();
        };

        let indent = depth * GLYPH_WIDTH;
        let mut label_lines = self.label.split(NEW_LINE);
        let first_line = label_lines.next().unwrap_or_default();

        let mut lines = Vec::with_capacity(1 + rest.len());
        let padding = col_start.saturating_sub(char_count(first_line) + indent);
        lines.push(format!("{first_line}{}{}", " ".repeat(padding), first.format()));
        lines.extend(label_lines.map(str::to_string));
        let padding = col_start.saturating_sub(indent);
        lines.extend(
            rest.iter()
                .map(|row| format!("{}{}", " ".repeat(padding), row.format())),
        );

        lines
            .iter()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Width in characters of the widest line of the label-only rendering.
pub fn measure(root: &Node) -> usize {
    render_with(root, None)
        .lines()
        .map(char_count)
        .max()
        .unwrap_or(0)
}

/// Renders the tree; `col_start` places the first annotation column, `None` prints labels only.
pub fn render_with(root: &Node, col_start: Option<usize>) -> String {
    let mut out = root.text(0, col_start);
    out.push(NEW_LINE);
    render_items(&root.children, &mut Vec::new(), col_start, &mut out);
    out
}

fn render_items(items: &[Node], spaces: &mut Vec<bool>, col_start: Option<usize>, out: &mut String) {
    for (i, item) in items.iter().enumerate() {
        let last = i == items.len() - 1;
        render_text(&item.text(spaces.len() + 1, col_start), spaces, last, out);
        if !item.children.is_empty() {
            spaces.push(last);
            render_items(&item.children, spaces, col_start, out);
            spaces.pop();
        }
    }
}

fn render_text(text: &str, spaces: &[bool], last: bool, out: &mut String) {
    let prefix: String = spaces
        .iter()
        .map(|&space| if space { EMPTY_SPACE } else { CONTINUE_ITEM })
        .collect();

    for (i, line) in text.split(NEW_LINE).enumerate() {
        let indicator = match (i, last) {
            (0, false) => MIDDLE_ITEM,
            (0, true) => LAST_ITEM,
            (_, false) => CONTINUE_ITEM,
            (_, true) => EMPTY_SPACE,
        };
        out.push_str(&prefix);
        out.push_str(indicator);
        out.push_str(line);
        out.push(NEW_LINE);
    }
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// Pads `val` to `target` characters, or keeps its trailing `target` characters.
fn truncate_or_pad(val: &str, target: usize) -> String {
    let count = char_count(val);
    if count < target {
        format!("{val}{}", " ".repeat(target - count))
    } else {
        val.chars().skip(count - target).collect()
    }
}
