use serde::Deserialize;

/// Inline style flags carried by a rich-text span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

/// A run of plain text with its annotations
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RichText {
    pub plain_text: String,
    pub annotations: Annotations,
    pub href: Option<String>,
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Where an image or video is hosted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    External { url: String },
    /// Notion-hosted upload with a short-lived signed URL
    File { url: String },
    Unknown,
}

/// Callout icon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Emoji(String),
    External(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bulleted,
    Numbered,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Bulleted => "ul",
            ListKind::Numbered => "ol",
        }
    }
}

/// Type-specific payload of a block
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph {
        rich_text: Vec<RichText>,
    },
    Heading {
        level: u8,
        rich_text: Vec<RichText>,
    },
    ListItem {
        kind: ListKind,
        rich_text: Vec<RichText>,
    },
    Image(Media),
    Video(Media),
    Embed {
        url: Option<String>,
        html: Option<String>,
    },
    Code {
        rich_text: Vec<RichText>,
        language: Option<String>,
    },
    Quote {
        rich_text: Vec<RichText>,
    },
    Callout {
        icon: Option<Icon>,
        rich_text: Vec<RichText>,
    },
    Equation {
        rich_text: Vec<RichText>,
    },
    Divider,
    Unsupported(String),
}

/// One content block of a page
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub parent: Option<String>,
    pub has_children: bool,
    pub kind: BlockKind,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            parent: None,
            has_children: false,
            kind,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        match self.kind {
            BlockKind::ListItem { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// An item of a block listing. Entries returned without a type tag are kept
/// as placeholders so pagination and ordering stay intact.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Block(Block),
    Partial { id: String },
}

impl Entry {
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Entry::Block(block) => Some(block),
            Entry::Partial { .. } => None,
        }
    }
}

impl From<Block> for Entry {
    fn from(block: Block) -> Self {
        Entry::Block(block)
    }
}
