use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use futures::future::try_join_all;
use indexmap::IndexMap;

use crate::block::Entry;
use crate::client::ContentApi;
use crate::error::Result;
use crate::notion;

const UNKNOWN_AUTHOR: &str = "Unknown";

/// A row of the posts database
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub page_id: String,
    pub title: String,
    pub slug: String,
    /// `start` of the Date property, as sent by the API
    pub date: Option<String>,
    pub published: bool,
    /// User ids until resolved, display names afterwards
    pub authors: Vec<String>,
    pub preview: Vec<String>,
    pub tags: Vec<String>,
    pub content: Vec<Entry>,
}

impl Post {
    pub fn link(&self) -> String {
        format!("/blog/{}/", self.slug)
    }

    pub fn is_visible(&self, preview: bool) -> bool {
        self.published || preview
    }
}

/// Slug → post, in the order the database query returned them
pub type PostsTable = IndexMap<String, Post>;

/// Format a Notion date (`2024-03-05` or a full timestamp) as `March 05, 2024`.
/// Anything unparseable is returned as is.
pub fn format_date(date: &str) -> String {
    date.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map(|day| day.format("%B %d, %Y").to_string())
        .unwrap_or_else(|| date.to_string())
}

/// Query the posts database once and build the posts table.
pub async fn get_blog_index(api: &dyn ContentApi) -> Result<PostsTable> {
    let response = api.query_database().await?;
    let table = notion::parse_posts_table(&response);
    log::debug!("posts table has {} entries", table.len());
    Ok(table)
}

/// Fetch every block of a page, following the pagination cursor. Children
/// of list items are fetched too and placed right after their parent.
pub async fn get_page_blocks(api: &dyn ContentApi, page_id: &str) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = api.list_block_children(page_id, cursor.as_deref()).await?;
        log::debug!("fetched {} blocks of {page_id}", page.entries.len());

        for entry in page.entries {
            let nested_list = match &entry {
                Entry::Block(block) if block.has_children && block.list_kind().is_some() => {
                    Some(block.id.clone())
                }
                _ => None,
            };
            entries.push(entry);

            if let Some(parent_id) = nested_list {
                let children = Box::pin(get_page_blocks(api, &parent_id)).await?;
                entries.extend(children.into_iter().filter(|child| {
                    child
                        .as_block()
                        .is_some_and(|block| block.list_kind().is_some())
                }));
            }
        }

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(entries)
}

/// Look up display names for the given user ids concurrently.
pub async fn get_users(api: &dyn ContentApi, ids: &[String]) -> Result<HashMap<String, String>> {
    let users = try_join_all(ids.iter().map(|id| api.retrieve_user(id))).await?;
    Ok(ids
        .iter()
        .cloned()
        .zip(users)
        .map(|(id, user)| (id, user.name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())))
        .collect())
}

pub fn resolve_authors(ids: &[String], users: &HashMap<String, String>) -> Vec<String> {
    ids.iter()
        .map(|id| {
            users
                .get(id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
        })
        .collect()
}

/// Posts that should be listed, with author names resolved in one batch.
pub async fn get_index_posts(api: &dyn ContentApi, preview: bool) -> Result<Vec<Post>> {
    let table = get_blog_index(api).await?;
    let mut posts: Vec<Post> = table
        .into_values()
        .filter(|post| post.is_visible(preview))
        .collect();

    let ids: Vec<String> = posts
        .iter()
        .flat_map(|post| post.authors.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let users = get_users(api, &ids).await?;

    for post in &mut posts {
        post.authors = resolve_authors(&post.authors, &users);
    }
    Ok(posts)
}

/// Load a single post with its content and author names. Returns `None` for
/// an unknown slug, or for an unpublished post outside preview mode.
pub async fn get_post_data(
    api: &dyn ContentApi,
    slug: &str,
    preview: bool,
) -> Result<Option<Post>> {
    let mut table = get_blog_index(api).await?;

    let Some(mut post) = table.shift_remove(slug).filter(|post| post.is_visible(preview)) else {
        log::info!("Failed to find post for slug: {slug}");
        return Ok(None);
    };

    post.content = get_page_blocks(api, &post.page_id).await?;
    let users = get_users(api, &post.authors).await?;
    post.authors = resolve_authors(&post.authors, &users);

    Ok(Some(post))
}
