mod asset;
mod block;
mod client;
mod config;
mod error;
mod html;
mod notion;
mod post;
mod render;
mod site;

pub use asset::{Asset, asset_filename, content_disposition, fetch_asset};
pub use block::{Annotations, Block, BlockKind, Entry, Icon, ListKind, Media, RichText};
pub use client::{ContentApi, NotionClient, User};
pub use config::{Config, Credentials, Environment, NotionConfig, RenderConfig, SiteConfig};
pub use error::{Error, Result};
pub use html::{Element, Node, to_html};
pub use notion::{BlockPage, parse_block_list, parse_block_page, parse_entry, parse_posts_table};
pub use post::{
    Post, PostsTable, format_date, get_blog_index, get_index_posts, get_page_blocks,
    get_post_data, get_users,
};
pub use render::{RenderOptions, render_blocks, render_entries, rich_text_nodes};
pub use site::{BuildReport, build, document, index_page, not_found_page, post_page};

/// Render a block listing to an HTML fragment using the given config.
pub fn entries_to_html(entries: &[Entry], config: &Config) -> String {
    to_html(&render_entries(entries, &RenderOptions::new(config)))
}

/// Parse saved block JSON (a listing response or a bare array) and render it.
pub fn block_json_to_html(json: &str, config: &Config) -> Result<String> {
    let entries = parse_block_list(json)?;
    Ok(entries_to_html(&entries, config))
}
