use std::collections::HashMap;

use url::Url;

use crate::block::{Block, BlockKind, Entry, Icon, ListKind, Media, RichText};
use crate::config::{Config, Environment};
use crate::html::{Element, Node};

/// Settings that influence how blocks are turned into nodes
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub environment: Environment,
    pub social_domains: Vec<String>,
    pub social_embeds: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new(&Config::compiled_default())
    }
}

impl RenderOptions {
    pub fn new(config: &Config) -> Self {
        Self {
            environment: config.site.environment,
            social_domains: config.render.social_domains.clone(),
            social_embeds: config.render.social_embeds,
        }
    }

    /// Whether the URL's host is one of the social-media domains (or a subdomain of one).
    pub fn is_social(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.social_domains.iter().any(|domain| {
            host == domain.as_str()
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Render a block listing, dropping placeholder entries.
pub fn render_entries(entries: &[Entry], options: &RenderOptions) -> Vec<Node> {
    render_blocks(entries.iter().filter_map(Entry::as_block), options)
}

/// Render blocks in order. Consecutive list items are grouped into a single
/// list container; an item whose parent is an earlier item of the same run is
/// nested under it.
pub fn render_blocks<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
    options: &RenderOptions,
) -> Vec<Node> {
    let mut out = Vec::new();
    let mut run = ListRun::default();

    for block in blocks {
        if let BlockKind::ListItem { kind, rich_text } = &block.kind {
            run.push(block, *kind, rich_text);
            continue;
        }

        if let Some(list) = run.close() {
            out.push(list);
        }
        render_block(block, options, &mut out);
    }

    if let Some(list) = run.close() {
        out.push(list);
    }

    out
}

struct RunItem {
    kind: ListKind,
    content: Vec<Node>,
    nested: Vec<usize>,
    is_nested: bool,
}

/// Arena for one contiguous run of list items. Children always sit at a
/// higher index than their parent.
#[derive(Default)]
struct ListRun {
    items: Vec<RunItem>,
    index: HashMap<String, usize>,
    /// Kind of the most recent item; decides the outer container
    last_kind: Option<ListKind>,
}

impl ListRun {
    fn push(&mut self, block: &Block, kind: ListKind, rich_text: &[RichText]) {
        let idx = self.items.len();
        let mut item = RunItem {
            kind,
            content: rich_text_nodes(rich_text),
            nested: Vec::new(),
            is_nested: false,
        };

        if let Some(&parent) = block.parent.as_ref().and_then(|p| self.index.get(p)) {
            item.is_nested = true;
            self.items[parent].nested.push(idx);
        }

        self.items.push(item);
        self.index.insert(block.id.clone(), idx);
        self.last_kind = Some(kind);
    }

    /// Emit the list container for the run and reset it.
    fn close(&mut self) -> Option<Node> {
        let run = std::mem::take(self);
        let kind = run.last_kind?;
        let top: Vec<usize> = (0..run.items.len())
            .filter(|&i| !run.items[i].is_nested)
            .collect();
        Some(run.list(kind, &top))
    }

    fn list(&self, kind: ListKind, indices: &[usize]) -> Node {
        Element::new(kind.tag())
            .children(indices.iter().map(|&i| self.item(i)))
            .into()
    }

    fn item(&self, idx: usize) -> Node {
        let item = &self.items[idx];
        let mut li = Element::new("li").children(item.content.iter().cloned());
        if let Some(&first) = item.nested.first() {
            li = li.child(self.list(self.items[first].kind, &item.nested));
        }
        li.into()
    }
}

fn render_block(block: &Block, options: &RenderOptions, out: &mut Vec<Node>) {
    match &block.kind {
        BlockKind::Divider => {}
        BlockKind::Paragraph { rich_text } => {
            out.push(Element::new("p").children(rich_text_nodes(rich_text)).into());
        }
        BlockKind::Heading { level, rich_text } => {
            let tag = match *level {
                1 => "h1",
                2 => "h2",
                _ => "h3",
            };
            out.push(Element::new(tag).children(rich_text_nodes(rich_text)).into());
        }
        BlockKind::Image(Media::External { url }) => {
            let img = Element::new("img")
                .attr("src", url)
                .attr("alt", "An image from Notion");
            out.push(img.into());
        }
        BlockKind::Video(Media::External { url }) => {
            let video = Element::new("video")
                .attr("src", url)
                .flag("controls")
                .flag("loop")
                .flag("muted")
                .flag("autoplay");
            out.push(video.into());
        }
        // Only externally hosted media is rendered
        BlockKind::Image(_) | BlockKind::Video(_) => {}
        BlockKind::Embed { url, html } => {
            render_embed(url.as_deref(), html.as_deref(), options, out);
        }
        BlockKind::Code {
            rich_text,
            language,
        } => {
            let language = language.as_deref().unwrap_or_default();
            let mut code = Element::new("code");
            if !language.is_empty() {
                code = code.attr("class", format!("language-{language}"));
            }
            let code = code.text(first_plain_text(rich_text));
            out.push(Element::new("pre").child(code.into()).into());
        }
        BlockKind::Quote { rich_text } => {
            let text: String = rich_text.iter().map(|t| t.plain_text.as_str()).collect();
            out.push(Element::new("blockquote").text(text).into());
        }
        BlockKind::Callout { icon, rich_text } => {
            let mut callout = Element::new("div").attr("class", "callout");
            match icon {
                Some(Icon::Emoji(emoji)) => {
                    callout = callout.child(Element::new("div").text(emoji.as_str()).into());
                }
                Some(Icon::External(url)) => {
                    let img = Element::new("img").attr("src", url).attr("alt", "");
                    callout = callout.child(Element::new("div").child(img.into()).into());
                }
                None => {}
            }
            let text = Element::new("div")
                .attr("class", "text")
                .children(rich_text_nodes(rich_text));
            out.push(callout.child(text.into()).into());
        }
        BlockKind::Equation { rich_text } => {
            let expression = first_plain_text(rich_text);
            let math = Element::new("span")
                .attr("class", "equation")
                .attr("data-display", "block")
                .text(format!("\\[{expression}\\]"));
            out.push(math.into());
        }
        // Grouped by ListRun before reaching here
        BlockKind::ListItem { .. } => {}
        BlockKind::Unsupported(kind) => {
            if !options.environment.is_production() {
                log::warn!("unknown block type {kind} (block {})", block.id);
            }
        }
    }
}

fn render_embed(
    url: Option<&str>,
    html: Option<&str>,
    options: &RenderOptions,
    out: &mut Vec<Node>,
) {
    match (url, html) {
        (Some(url), _) if !url.is_empty() => {
            if options.social_embeds && options.is_social(url) {
                let link = Element::new("a").attr("href", url).text(url);
                let widget = Element::new("blockquote")
                    .attr("class", "twitter-tweet")
                    .child(link.into());
                out.push(widget.into());
            } else {
                out.push(Element::new("iframe").attr("src", url).into());
            }
        }
        (_, Some(html)) if !html.is_empty() => {
            out.push(Element::new("div").child(Node::Raw(html.to_string())).into());
        }
        _ => {}
    }
}

fn first_plain_text(rich_text: &[RichText]) -> &str {
    rich_text
        .first()
        .map(|t| t.plain_text.as_str())
        .unwrap_or_default()
}

/// Render spans left to right with a line break between consecutive spans.
pub fn rich_text_nodes(spans: &[RichText]) -> Vec<Node> {
    let mut out = Vec::with_capacity(spans.len() * 2);
    for (i, span) in spans.iter().enumerate() {
        out.push(annotated(span));
        if i + 1 < spans.len() {
            out.push(Element::new("br").into());
        }
    }
    out
}

/// Wrap a span's text in its annotation elements. Bold is outermost and
/// inline code innermost; a link wraps everything.
fn annotated(span: &RichText) -> Node {
    let a = span.annotations;
    let mut node = Node::Text(span.plain_text.clone());

    for (enabled, tag) in [
        (a.code, "code"),
        (a.underline, "u"),
        (a.strikethrough, "s"),
        (a.italic, "em"),
        (a.bold, "strong"),
    ] {
        if enabled {
            node = Element::new(tag).child(node).into();
        }
    }

    if let Some(href) = &span.href {
        node = Element::new("a")
            .attr("href", href)
            .attr("rel", "noopener")
            .attr("target", "_blank")
            .child(node)
            .into();
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Annotations;
    use crate::html::to_html;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn html(blocks: &[Block]) -> String {
        to_html(&render_blocks(blocks, &RenderOptions::default()))
    }

    fn para(id: &str, text: &str) -> Block {
        Block::new(
            id,
            BlockKind::Paragraph {
                rich_text: vec![RichText::plain(text)],
            },
        )
    }

    fn item(id: &str, kind: ListKind, text: &str) -> Block {
        Block::new(
            id,
            BlockKind::ListItem {
                kind,
                rich_text: vec![RichText::plain(text)],
            },
        )
    }

    fn bullet(id: &str, text: &str) -> Block {
        item(id, ListKind::Bulleted, text)
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn paragraphs_and_nested_list() {
        let blocks = [
            para("p1", "a"),
            bullet("1", "x"),
            bullet("2", "y").with_parent("1"),
            para("p2", "b"),
        ];
        assert_eq!(
            html(&blocks),
            "<p>a</p><ul><li>x<ul><li>y</li></ul></li></ul><p>b</p>"
        );
    }

    #[test]
    fn no_list_items_no_container() {
        let blocks = [
            para("p1", "a"),
            Block::new("d", BlockKind::Divider),
            para("p2", "b"),
        ];
        let out = html(&blocks);
        assert!(!out.contains("<ul>"));
        assert!(!out.contains("<ol>"));
    }

    #[test]
    fn flat_run_keeps_input_order() {
        let blocks = [bullet("1", "one"), bullet("2", "two"), bullet("3", "three")];
        assert_eq!(
            html(&blocks),
            "<ul><li>one</li><li>two</li><li>three</li></ul>"
        );
    }

    #[test]
    fn parent_outside_run_stays_top_level() {
        let blocks = [
            bullet("1", "one").with_parent("page"),
            bullet("2", "two").with_parent("page"),
        ];
        assert_eq!(html(&blocks), "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn nested_item_never_top_level() {
        let blocks = [
            bullet("1", "a"),
            bullet("2", "b"),
            bullet("3", "c").with_parent("1"),
        ];
        assert_eq!(
            html(&blocks),
            "<ul><li>a<ul><li>c</li></ul></li><li>b</li></ul>"
        );
    }

    #[test]
    fn deep_nesting() {
        let blocks = [
            bullet("1", "a"),
            bullet("2", "b").with_parent("1"),
            bullet("3", "c").with_parent("2"),
        ];
        assert_eq!(
            html(&blocks),
            "<ul><li>a<ul><li>b<ul><li>c</li></ul></li></ul></li></ul>"
        );
    }

    #[test]
    fn separated_runs_are_independent() {
        let blocks = [
            bullet("1", "a"),
            para("p", "mid"),
            bullet("2", "b").with_parent("1"),
        ];
        assert_eq!(
            html(&blocks),
            "<ul><li>a</li></ul><p>mid</p><ul><li>b</li></ul>"
        );
    }

    #[test]
    fn numbered_run_uses_ordered_list() {
        let blocks = [
            item("1", ListKind::Numbered, "first"),
            item("2", ListKind::Numbered, "second"),
        ];
        assert_eq!(html(&blocks), "<ol><li>first</li><li>second</li></ol>");
    }

    #[test]
    fn mixed_run_takes_last_item_kind() {
        let blocks = [bullet("1", "a"), item("2", ListKind::Numbered, "b")];
        assert_eq!(html(&blocks), "<ol><li>a</li><li>b</li></ol>");

        let blocks = [item("1", ListKind::Numbered, "a"), bullet("2", "b")];
        assert_eq!(html(&blocks), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn nested_container_follows_child_kind() {
        let blocks = [
            bullet("1", "a"),
            item("2", ListKind::Numbered, "b").with_parent("1"),
            bullet("3", "c"),
        ];
        assert_eq!(
            html(&blocks),
            "<ul><li>a<ol><li>b</li></ol></li><li>c</li></ul>"
        );
    }

    #[test]
    fn trailing_nested_item_decides_outer_container() {
        let blocks = [
            bullet("1", "a"),
            item("2", ListKind::Numbered, "b").with_parent("1"),
        ];
        assert_eq!(html(&blocks), "<ol><li>a<ol><li>b</li></ol></li></ol>");
    }

    #[test]
    fn partial_entries_are_dropped() {
        let entries = [
            Entry::Partial { id: "x".into() },
            bullet("1", "a").into(),
            Entry::Partial { id: "y".into() },
        ];
        let nodes = render_entries(&entries, &RenderOptions::default());
        assert_eq!(to_html(&nodes), "<ul><li>a</li></ul>");
    }

    #[rstest]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(5, 4)]
    fn line_breaks_between_spans(#[case] spans: usize, #[case] breaks: usize) {
        let rich_text: Vec<RichText> = (0..spans)
            .map(|i| RichText::plain(format!("s{i}")))
            .collect();
        let out = to_html(&rich_text_nodes(&rich_text));
        assert_eq!(count(&out, "<br>"), breaks);
        assert!(!out.ends_with("<br>"));
    }

    #[rstest]
    #[case(Annotations { bold: true, ..Default::default() }, "<strong>t</strong>")]
    #[case(Annotations { italic: true, ..Default::default() }, "<em>t</em>")]
    #[case(Annotations { bold: true, italic: true, ..Default::default() }, "<strong><em>t</em></strong>")]
    #[case(Annotations { bold: true, strikethrough: true, ..Default::default() }, "<strong><s>t</s></strong>")]
    #[case(
        Annotations { bold: true, italic: true, strikethrough: true, underline: true, code: true },
        "<strong><em><s><u><code>t</code></u></s></em></strong>"
    )]
    fn annotation_nesting(#[case] annotations: Annotations, #[case] expected: &str) {
        let span = RichText::plain("t").with_annotations(annotations);
        assert_eq!(to_html(&rich_text_nodes(&[span])), expected);
    }

    #[test]
    fn link_wraps_annotations() {
        let span = RichText {
            plain_text: "site".into(),
            annotations: Annotations {
                bold: true,
                ..Default::default()
            },
            href: Some("https://example.com".into()),
        };
        assert_eq!(
            to_html(&rich_text_nodes(&[span])),
            "<a href=\"https://example.com\" rel=\"noopener\" target=\"_blank\"><strong>site</strong></a>"
        );
    }

    #[test]
    fn headings() {
        let blocks: Vec<Block> = (1..=3)
            .map(|level| {
                Block::new(
                    format!("h{level}"),
                    BlockKind::Heading {
                        level,
                        rich_text: vec![RichText::plain("T")],
                    },
                )
            })
            .collect();
        assert_eq!(html(&blocks), "<h1>T</h1><h2>T</h2><h3>T</h3>");
    }

    #[test]
    fn external_image() {
        let block = Block::new(
            "i",
            BlockKind::Image(Media::External {
                url: "https://img.test/a.png".into(),
            }),
        );
        assert_eq!(
            html(&[block]),
            "<img src=\"https://img.test/a.png\" alt=\"An image from Notion\">"
        );
    }

    #[test]
    fn non_external_image_yields_nothing() {
        let block = Block::new(
            "i",
            BlockKind::Image(Media::File {
                url: "https://s3.test/a.png".into(),
            }),
        );
        assert!(render_blocks(&[block], &RenderOptions::default()).is_empty());
    }

    #[test]
    fn external_video() {
        let block = Block::new(
            "v",
            BlockKind::Video(Media::External {
                url: "https://v.test/a.mp4".into(),
            }),
        );
        assert_eq!(
            html(&[block]),
            "<video src=\"https://v.test/a.mp4\" controls loop muted autoplay></video>"
        );
    }

    #[test]
    fn divider_yields_nothing() {
        let blocks = [Block::new("d", BlockKind::Divider)];
        assert!(render_blocks(&blocks, &RenderOptions::default()).is_empty());
    }

    #[test]
    fn unsupported_yields_nothing() {
        let block = Block::new("u", BlockKind::Unsupported("table".into()));
        assert!(render_blocks(&[block], &RenderOptions::default()).is_empty());
    }

    #[test]
    fn code_block_uses_first_span_and_language() {
        let block = Block::new(
            "c",
            BlockKind::Code {
                rich_text: vec![RichText::plain("let x = 1;"), RichText::plain("ignored")],
                language: Some("rust".into()),
            },
        );
        assert_eq!(
            html(&[block]),
            "<pre><code class=\"language-rust\">let x = 1;</code></pre>"
        );
    }

    #[test]
    fn quote_drops_annotations() {
        let block = Block::new(
            "q",
            BlockKind::Quote {
                rich_text: vec![
                    RichText::plain("to be ").with_annotations(Annotations {
                        bold: true,
                        ..Default::default()
                    }),
                    RichText::plain("or not"),
                ],
            },
        );
        assert_eq!(html(&[block]), "<blockquote>to be or not</blockquote>");
    }

    #[test]
    fn callout_with_icon() {
        let block = Block::new(
            "c",
            BlockKind::Callout {
                icon: Some(Icon::Emoji("💡".into())),
                rich_text: vec![RichText::plain("note")],
            },
        );
        assert_eq!(
            html(&[block]),
            "<div class=\"callout\"><div>💡</div><div class=\"text\">note</div></div>"
        );
    }

    #[test]
    fn callout_with_image_icon_keeps_empty_alt() {
        let block = Block::new(
            "c",
            BlockKind::Callout {
                icon: Some(Icon::External("https://img.test/i.png".into())),
                rich_text: vec![RichText::plain("note")],
            },
        );
        assert_eq!(
            html(&[block]),
            "<div class=\"callout\"><div><img src=\"https://img.test/i.png\" alt=\"\"></div>\
             <div class=\"text\">note</div></div>"
        );
    }

    #[test]
    fn callout_without_icon() {
        let block = Block::new(
            "c",
            BlockKind::Callout {
                icon: None,
                rich_text: vec![RichText::plain("note")],
            },
        );
        assert_eq!(
            html(&[block]),
            "<div class=\"callout\"><div class=\"text\">note</div></div>"
        );
    }

    #[test]
    fn equation_in_display_mode() {
        let block = Block::new(
            "e",
            BlockKind::Equation {
                rich_text: vec![RichText::plain("e = mc^2")],
            },
        );
        assert_eq!(
            html(&[block]),
            "<span class=\"equation\" data-display=\"block\">\\[e = mc^2\\]</span>"
        );
    }

    fn embed(url: Option<&str>, markup: Option<&str>) -> Block {
        Block::new(
            "e",
            BlockKind::Embed {
                url: url.map(str::to_string),
                html: markup.map(str::to_string),
            },
        )
    }

    #[test]
    fn embed_generic_frame() {
        assert_eq!(
            html(&[embed(Some("https://maps.test/x"), None)]),
            "<iframe src=\"https://maps.test/x\"></iframe>"
        );
    }

    #[test]
    fn embed_inline_html() {
        assert_eq!(
            html(&[embed(None, Some("<b>hi</b>"))]),
            "<div><b>hi</b></div>"
        );
    }

    #[test]
    fn embed_url_takes_precedence_over_html() {
        assert_eq!(
            html(&[embed(Some("https://x.com/a/status/1"), Some("<b>hi</b>"))]),
            "<iframe src=\"https://x.com/a/status/1\"></iframe>"
        );
    }

    #[test]
    fn embed_without_url_or_html_yields_nothing() {
        assert!(render_blocks(&[embed(None, None)], &RenderOptions::default()).is_empty());
    }

    #[test]
    fn social_widget_when_enabled() {
        let options = RenderOptions {
            social_embeds: true,
            ..RenderOptions::default()
        };
        let nodes = render_blocks(&[embed(Some("https://x.com/a/status/1"), None)], &options);
        assert_eq!(
            to_html(&nodes),
            "<blockquote class=\"twitter-tweet\"><a href=\"https://x.com/a/status/1\">https://x.com/a/status/1</a></blockquote>"
        );
    }

    #[rstest]
    #[case("https://x.com/a", true)]
    #[case("https://mobile.twitter.com/a", true)]
    #[case("https://notx.com/a", false)]
    #[case("https://example.com/x.com", false)]
    #[case("not a url", false)]
    fn social_domain_matching(#[case] url: &str, #[case] social: bool) {
        assert_eq!(RenderOptions::default().is_social(url), social);
    }
}
