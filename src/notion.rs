//! Conversion of Notion API JSON into the block and post model.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::block::{Block, BlockKind, Entry, Icon, ListKind, Media, RichText};
use crate::error::Result;
use crate::post::{Post, PostsTable};

/// One page of a block-children listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPage {
    pub entries: Vec<Entry>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct RawListing {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    parent: Option<Parent>,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

#[derive(Deserialize)]
struct Parent {
    database_id: Option<String>,
    page_id: Option<String>,
    block_id: Option<String>,
}

impl Parent {
    fn into_id(self) -> Option<String> {
        self.database_id.or(self.page_id).or(self.block_id)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TextPayload {
    rich_text: Vec<RichText>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CodePayload {
    rich_text: Vec<RichText>,
    language: Option<String>,
}

#[derive(Deserialize)]
struct UrlObject {
    url: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MediaPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    external: Option<UrlObject>,
    file: Option<UrlObject>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct EmbedPayload {
    url: Option<String>,
    html: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawIcon {
    emoji: Option<String>,
    external: Option<UrlObject>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CalloutPayload {
    rich_text: Vec<RichText>,
    icon: Option<RawIcon>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct EquationPayload {
    rich_text: Vec<RichText>,
    expression: Option<String>,
}

/// Take the type-specific object out of the block, falling back to an empty
/// payload when it is missing or malformed.
fn payload<T: DeserializeOwned + Default>(fields: &mut Map<String, Value>, key: &str) -> T {
    fields
        .remove(key)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

fn media(payload: MediaPayload) -> Media {
    match (payload.kind.as_deref(), payload.external, payload.file) {
        (Some("external"), Some(external), _) => Media::External { url: external.url },
        (Some("file"), _, Some(file)) => Media::File { url: file.url },
        _ => Media::Unknown,
    }
}

fn block_kind(tag: &str, fields: &mut Map<String, Value>) -> BlockKind {
    match tag {
        "paragraph" => BlockKind::Paragraph {
            rich_text: payload::<TextPayload>(fields, tag).rich_text,
        },
        "heading_1" | "heading_2" | "heading_3" => BlockKind::Heading {
            level: match tag {
                "heading_1" => 1,
                "heading_2" => 2,
                _ => 3,
            },
            rich_text: payload::<TextPayload>(fields, tag).rich_text,
        },
        "bulleted_list_item" => BlockKind::ListItem {
            kind: ListKind::Bulleted,
            rich_text: payload::<TextPayload>(fields, tag).rich_text,
        },
        "numbered_list_item" => BlockKind::ListItem {
            kind: ListKind::Numbered,
            rich_text: payload::<TextPayload>(fields, tag).rich_text,
        },
        "image" => BlockKind::Image(media(payload(fields, tag))),
        "video" => BlockKind::Video(media(payload(fields, tag))),
        "embed" => {
            let embed: EmbedPayload = payload(fields, tag);
            BlockKind::Embed {
                url: embed.url,
                html: embed.html,
            }
        }
        "code" => {
            let code: CodePayload = payload(fields, tag);
            BlockKind::Code {
                rich_text: code.rich_text,
                language: code.language,
            }
        }
        "quote" => BlockKind::Quote {
            rich_text: payload::<TextPayload>(fields, tag).rich_text,
        },
        "callout" => {
            let callout: CalloutPayload = payload(fields, tag);
            let icon = callout.icon.and_then(|icon| match (icon.emoji, icon.external) {
                (Some(emoji), _) => Some(Icon::Emoji(emoji)),
                (None, Some(external)) => Some(Icon::External(external.url)),
                (None, None) => None,
            });
            BlockKind::Callout {
                icon,
                rich_text: callout.rich_text,
            }
        }
        "equation" => {
            let equation: EquationPayload = payload(fields, tag);
            let rich_text = match equation.expression {
                Some(expression) if equation.rich_text.is_empty() => {
                    vec![RichText::plain(expression)]
                }
                _ => equation.rich_text,
            };
            BlockKind::Equation { rich_text }
        }
        "divider" => BlockKind::Divider,
        other => BlockKind::Unsupported(other.to_string()),
    }
}

/// Convert one listing result. Results without a type tag become partials.
pub fn parse_entry(value: Value) -> Entry {
    let raw: RawBlock = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(_) => return Entry::Partial { id: String::new() },
    };
    let RawBlock {
        id,
        kind,
        parent,
        has_children,
        mut payload,
    } = raw;

    let Some(tag) = kind else {
        return Entry::Partial { id };
    };

    Entry::Block(Block {
        id,
        parent: parent.and_then(Parent::into_id),
        has_children,
        kind: block_kind(&tag, &mut payload),
    })
}

pub fn parse_entries(values: Vec<Value>) -> Vec<Entry> {
    values.into_iter().map(parse_entry).collect()
}

/// Parse a block-children response (`{"results": [...], "has_more": ...}`).
pub fn parse_block_page(value: Value) -> Result<BlockPage> {
    let listing: RawListing = serde_json::from_value(value)?;
    Ok(BlockPage {
        entries: parse_entries(listing.results),
        has_more: listing.has_more,
        next_cursor: listing.next_cursor,
    })
}

/// Parse saved block JSON: either a listing response or a bare array of blocks.
pub fn parse_block_list(json: &str) -> Result<Vec<Entry>> {
    match serde_json::from_str(json)? {
        Value::Array(values) => Ok(parse_entries(values)),
        value => Ok(parse_block_page(value)?.entries),
    }
}

fn plain_texts(value: &Value) -> Vec<String> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|rt| rt["plain_text"].as_str())
        .map(str::to_string)
        .collect()
}

/// Build the posts table from a database query response. Pages without a
/// slug are skipped.
pub fn parse_posts_table(response: &Value) -> PostsTable {
    let mut table = PostsTable::new();

    for page in response["results"].as_array().into_iter().flatten() {
        let Some(properties) = page.get("properties") else {
            continue;
        };
        let Some(slug) = plain_texts(&properties["Slug"]["rich_text"])
            .into_iter()
            .next()
            .filter(|slug| !slug.is_empty())
        else {
            continue;
        };

        let post = Post {
            page_id: page["id"].as_str().unwrap_or_default().to_string(),
            title: plain_texts(&properties["Name"]["title"])
                .into_iter()
                .next()
                .unwrap_or_default(),
            slug: slug.clone(),
            date: properties["Date"]["date"]["start"]
                .as_str()
                .map(str::to_string),
            published: properties["Published"]["checkbox"]
                .as_bool()
                .unwrap_or(false),
            authors: properties["Authors"]["people"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|person| person["id"].as_str())
                .map(str::to_string)
                .collect(),
            preview: plain_texts(&properties["Preview"]["rich_text"]),
            tags: properties["Tags"]["multi_select"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|tag| tag["name"].as_str())
                .map(str::to_string)
                .collect(),
            content: Vec::new(),
        };
        table.insert(slug, post);
    }

    table
}
