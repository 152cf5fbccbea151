pub type MarkdownText = Vec<MarkdownInline>;

#[derive(Clone, Debug, PartialEq)]
pub enum Markdown {
    Heading(usize, MarkdownText),
    Paragraph(MarkdownText),
    UnorderedList(Vec<ListItem>),
    OrderedList(Vec<ListItem>),
    TaskListItem(bool, MarkdownText),
    Table(Table),
    Codeblock(String, String),
    HorizontalRule,
    Blockquote(Vec<Markdown>),
    Html(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum MarkdownInline {
    Link(String, String),
    Image(String, String),
    InlineCode(String),
    Bold(String),
    Italic(String),
    Strike(String),
    LineBreak,
    Plaintext(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Ordered(u64),
    Task(bool),
}

/// One line item of a list; `depth` 0 is the outermost level.
#[derive(Clone, Debug, PartialEq)]
pub struct ListItem {
    pub depth: usize,
    pub marker: ListMarker,
    pub text: MarkdownText,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Every row, header included, has `alignments.len()` cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<MarkdownText>,
    pub rows: Vec<Vec<MarkdownText>>,
}
