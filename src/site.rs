use std::fs;
use std::path::{Path, PathBuf};

use crate::client::ContentApi;
use crate::config::Config;
use crate::error::Result;
use crate::html::{Element, Node, to_html};
use crate::post::{self, Post, format_date};
use crate::render::{RenderOptions, render_entries};

const KATEX_VERSION: &str = "0.16.9";

/// What a build wrote
#[derive(Debug, Default)]
pub struct BuildReport {
    pub pages: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

fn preview_banner() -> Node {
    Element::new("div")
        .attr("class", "preview-alert")
        .child(Element::new("b").text("Note:").into())
        .text(" Viewing in preview mode")
        .into()
}

fn byline(post: &Post, out: &mut Vec<Node>) {
    if !post.authors.is_empty() {
        let authors = Element::new("div")
            .attr("class", "authors")
            .text(format!("By: {}", post.authors.join(" ")));
        out.push(authors.into());
    }
    if let Some(date) = &post.date {
        let posted = Element::new("div")
            .attr("class", "posted")
            .text(format!("Posted: {}", format_date(date)));
        out.push(posted.into());
    }
}

/// The blog index listing
pub fn index_page(posts: &[Post], preview: bool, config: &Config) -> Vec<Node> {
    let mut body = Vec::new();
    if preview {
        body.push(preview_banner());
    }

    let mut index = Element::new("div")
        .attr("class", "blog-index")
        .child(Element::new("h1").text(config.site.title.as_str()).into());

    if posts.is_empty() {
        index = index.child(
            Element::new("p")
                .attr("class", "no-posts")
                .text("There are no posts yet")
                .into(),
        );
    }

    for post in posts {
        let mut title = Element::new("span").attr("class", "title-container");
        if !post.published {
            let badge = Element::new("span").attr("class", "draft-badge").text("Draft");
            title = title.child(badge.into());
        }
        let link = Element::new("a").attr("href", post.link()).text(post.title.as_str());
        title = title.child(link.into());

        let mut entry = vec![Element::new("h3").child(title.into()).into()];
        byline(post, &mut entry);
        if post.preview.is_empty() {
            entry.push(Element::new("p").text("No preview available").into());
        }
        entry.extend(
            post.preview
                .iter()
                .map(|text| Element::new("p").text(text.as_str()).into()),
        );

        index = index.child(
            Element::new("div")
                .attr("class", "post-preview")
                .children(entry)
                .into(),
        );
    }

    body.push(index.into());
    body
}

/// A single post with its rendered content
pub fn post_page(post: &Post, preview: bool, config: &Config) -> Vec<Node> {
    let mut body = Vec::new();
    if preview {
        body.push(preview_banner());
    }

    let mut article = vec![Element::new("h1").text(post.title.as_str()).into()];
    byline(post, &mut article);
    article.push(Element::new("hr").into());

    let content = render_entries(&post.content, &RenderOptions::new(config));
    if content.is_empty() {
        article.push(Element::new("p").text("This post has no content").into());
    } else {
        article.extend(content);
    }

    body.push(
        Element::new("article")
            .attr("class", "post")
            .children(article)
            .into(),
    );
    body
}

pub fn not_found_page() -> Vec<Node> {
    let message = Element::new("p")
        .text("Woops! Didn't find that post, redirecting you back to the blog index");
    vec![
        Element::new("div")
            .attr("class", "post")
            .child(message.into())
            .into(),
    ]
}

/// Wrap body nodes in a complete HTML document
pub fn document(title: &str, body: Vec<Node>, config: &Config) -> String {
    let katex = format!("https://cdn.jsdelivr.net/npm/katex@{KATEX_VERSION}/dist");

    let mut head = Element::new("head")
        .child(Element::new("meta").attr("charset", "utf-8").into())
        .child(
            Element::new("meta")
                .attr("name", "viewport")
                .attr("content", "width=device-width, initial-scale=1")
                .into(),
        );
    if !config.site.description.is_empty() {
        head = head.child(
            Element::new("meta")
                .attr("name", "description")
                .attr("content", config.site.description.as_str())
                .into(),
        );
    }
    let head = head
        .child(Element::new("title").text(format!("{title} | {}", config.site.title)).into())
        .child(
            Element::new("link")
                .attr("rel", "stylesheet")
                .attr("href", format!("{katex}/katex.min.css"))
                .into(),
        )
        .child(
            Element::new("script")
                .flag("defer")
                .attr("src", format!("{katex}/katex.min.js"))
                .into(),
        )
        .child(
            Element::new("script")
                .flag("defer")
                .attr("src", format!("{katex}/contrib/auto-render.min.js"))
                .attr("onload", "renderMathInElement(document.body);")
                .into(),
        );

    let html = Element::new("html")
        .attr("lang", "en")
        .child(head.into())
        .child(Element::new("body").children(body).into());

    let mut out = String::from("<!DOCTYPE html>\n");
    out.push_str(&to_html(&[html.into()]));
    out.push('\n');
    out
}

/// Slugs become directory names, so only a single plain path segment is allowed.
fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
}

fn write_page(path: PathBuf, html: &str, report: &mut BuildReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, html)?;
    log::debug!("wrote {}", path.display());
    report.pages.push(path);
    Ok(())
}

/// Fetch every visible post and write the static site into `out_dir`.
pub async fn build(
    api: &dyn ContentApi,
    config: &Config,
    out_dir: &Path,
    preview: bool,
) -> Result<BuildReport> {
    let mut report = BuildReport::default();
    let mut posts = post::get_index_posts(api, preview).await?;
    log::info!("building {} posts into {}", posts.len(), out_dir.display());

    let index = document("Blog", index_page(&posts, preview, config), config);
    write_page(out_dir.join("index.html"), &index, &mut report)?;

    for post in &mut posts {
        if !is_safe_slug(&post.slug) {
            log::warn!("skipping post with unusable slug {:?}", post.slug);
            report.skipped.push(post.slug.clone());
            continue;
        }

        post.content = post::get_page_blocks(api, &post.page_id).await?;
        let page = document(&post.title, post_page(post, preview, config), config);
        let path = out_dir.join("blog").join(&post.slug).join("index.html");
        write_page(path, &page, &mut report)?;
    }

    log::info!("wrote {} pages", report.pages.len());
    Ok(report)
}
