use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Fixed converter configuration. Fenced code is always on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub simplified_autolink: bool,
    pub exclude_trailing_punctuation_from_urls: bool,
    pub strikethrough: bool,
    pub tables: bool,
    pub tasklists: bool,
    pub simple_line_breaks: bool,
    pub emoji: bool,
    /// `@user` links to the GitHub profile.
    pub mentions: bool,
    /// Headings get GitHub-style slug ids.
    pub heading_ids: bool,
}

impl RenderOptions {
    pub const GITHUB: Self = Self {
        simplified_autolink: true,
        exclude_trailing_punctuation_from_urls: true,
        strikethrough: true,
        tables: true,
        tasklists: true,
        simple_line_breaks: true,
        emoji: true,
        mentions: true,
        heading_ids: true,
    };
}

#[derive(Clone, Debug)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, self.parser_options());
        let mut events = self.rewrite(parser);
        if self.options.heading_ids {
            assign_heading_ids(&mut events);
        }
        let mut out = String::with_capacity(text.len() + text.len() / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.options.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.options.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.options.tasklists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        options
    }

    fn rewrite<'a>(&self, events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::new();
        // The parser splits prose into several text events; merge them so
        // URLs and shortcodes are seen whole.
        let mut pending: Option<String> = None;
        // Depth of links, images, code blocks and inline `<a>` tags, whose
        // text stays verbatim.
        let mut verbatim = 0usize;

        for event in events {
            if let Event::Text(text) = &event {
                if verbatim == 0 {
                    pending.get_or_insert_with(String::new).push_str(text);
                    continue;
                }
            }
            if let Some(text) = pending.take() {
                self.expand_text(&text, &mut out);
            }
            match &event {
                Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                    verbatim += 1
                }
                Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                    verbatim = verbatim.saturating_sub(1)
                }
                Event::InlineHtml(tag) => match anchor_tag(tag) {
                    Some(true) => verbatim += 1,
                    Some(false) => verbatim = verbatim.saturating_sub(1),
                    None => {}
                },
                _ => {}
            }
            out.push(match event {
                Event::SoftBreak if self.options.simple_line_breaks => Event::HardBreak,
                other => other,
            });
        }
        if let Some(text) = pending.take() {
            self.expand_text(&text, &mut out);
        }
        out
    }

    fn expand_text<'a>(&self, text: &str, out: &mut Vec<Event<'a>>) {
        if !self.options.simplified_autolink {
            self.push_prose(text, out);
            return;
        }

        let mut last = 0;
        for found in url_regex().find_iter(text) {
            let start = found.start();
            let url = if self.options.exclude_trailing_punctuation_from_urls {
                trim_trailing_punctuation(found.as_str())
            } else {
                found.as_str()
            };
            if url.is_empty() {
                continue;
            }
            self.push_prose(&text[last..start], out);

            let dest = if url.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("www.")) {
                format!("http://{url}")
            } else {
                url.to_string()
            };
            out.push(Event::Start(Tag::Link {
                link_type: LinkType::Autolink,
                dest_url: CowStr::from(dest),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }));
            out.push(Event::Text(CowStr::from(url.to_string())));
            out.push(Event::End(TagEnd::Link));
            last = start + url.len();
        }
        self.push_prose(&text[last..], out);
    }

    fn push_prose<'a>(&self, text: &str, out: &mut Vec<Event<'a>>) {
        if !self.options.mentions {
            self.push_plain(text, out);
            return;
        }

        let mut last = 0;
        for caps in mention_regex().captures_iter(text) {
            let (Some(at), Some(user)) = (caps.get(2), caps.get(3)) else {
                continue;
            };
            self.push_plain(&text[last..at.start()], out);
            out.push(Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::from(format!("https://www.github.com/{}", user.as_str())),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }));
            out.push(Event::Text(CowStr::from(at.as_str().to_string())));
            out.push(Event::End(TagEnd::Link));
            last = at.end();
        }
        self.push_plain(&text[last..], out);
    }

    fn push_plain<'a>(&self, text: &str, out: &mut Vec<Event<'a>>) {
        if text.is_empty() {
            return;
        }
        let text = if self.options.emoji {
            replace_emoji(text)
        } else {
            Cow::Borrowed(text)
        };
        out.push(Event::Text(CowStr::from(text.into_owned())));
    }
}

/// `Some(true)` for an opening `<a ...>`, `Some(false)` for `</a>`.
fn anchor_tag(html: &str) -> Option<bool> {
    let html = html.trim_start();
    let (rest, opening) = match html.get(..3) {
        Some(head) if head.eq_ignore_ascii_case("</a") => (&html[3..], false),
        _ => match html.get(..2) {
            Some(head) if head.eq_ignore_ascii_case("<a") => (&html[2..], true),
            _ => return None,
        },
    };
    match rest.chars().next() {
        Some(c) if c == '>' || c.is_whitespace() => Some(opening),
        _ => None,
    }
}

fn mention_regex() -> &'static Regex {
    static RE_MENTION: OnceLock<Regex> = OnceLock::new();
    RE_MENTION.get_or_init(|| {
        Regex::new(r"(^|\s)(@([A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?))")
            .expect("valid mention regex")
    })
}

/// GitHub's anchor slug: spaces become dashes, punctuation is dropped.
fn github_slug(title: &str) -> String {
    const DROPPED: &str = "&+$,/:;=?@\"#{}|^~[]`\\*)(%.!'<>";
    title
        .chars()
        .filter(|c| !DROPPED.contains(*c))
        .map(|c| if c == ' ' { '-' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Repeated titles get `-1`, `-2`, ... appended.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut index = 0;
    while index < events.len() {
        if !matches!(events[index], Event::Start(Tag::Heading { id: None, .. })) {
            index += 1;
            continue;
        }
        let mut title = String::new();
        let mut end = index + 1;
        while end < events.len() {
            match &events[end] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(text) | Event::Code(text) => title.push_str(text),
                _ => {}
            }
            end += 1;
        }

        let slug = github_slug(&title);
        if !slug.is_empty() {
            let slug = match seen.get_mut(&slug) {
                Some(count) => {
                    let unique = format!("{slug}-{count}");
                    *count += 1;
                    unique
                }
                None => {
                    seen.insert(slug.clone(), 1);
                    slug
                }
            };
            if let Event::Start(Tag::Heading { id, .. }) = &mut events[index] {
                *id = Some(CowStr::from(slug));
            }
        }
        index = end + 1;
    }
}

fn url_regex() -> &'static Regex {
    static RE_URL: OnceLock<Regex> = OnceLock::new();
    RE_URL.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?://|ftp://|www\.)[^\s<>]+").expect("valid url regex")
    })
}

fn trim_trailing_punctuation(url: &str) -> &str {
    let mut url = url;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '"' | '\'' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !strip {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}

fn replace_emoji(text: &str) -> Cow<'_, str> {
    static RE_EMOJI: OnceLock<Regex> = OnceLock::new();
    let re = RE_EMOJI.get_or_init(|| Regex::new(r":([a-z0-9_+\-]+):").expect("valid emoji regex"));
    re.replace_all(text, |caps: &regex::Captures| {
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let code = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        emojis::get_by_shortcode(code)
            .map(|emoji| emoji.as_str())
            .unwrap_or(whole)
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str) -> String {
        MarkdownRenderer::new(RenderOptions::GITHUB).render(text)
    }

    #[test]
    fn renders_heading() {
        assert_eq!(render("# A"), "<h1 id=\"a\">A</h1>\n");
    }

    #[test]
    fn headings_get_github_slugs() {
        assert_eq!(
            render("# Hello World"),
            "<h1 id=\"hello-world\">Hello World</h1>\n"
        );
        let html = render("## What's `new`?\n\n## What's `new`?\n\n## What's `new`?");
        assert!(html.contains(r#"<h2 id="whats-new">"#), "{html}");
        assert!(html.contains(r#"<h2 id="whats-new-1">"#), "{html}");
        assert!(html.contains(r#"<h2 id="whats-new-2">"#), "{html}");
    }

    #[test]
    fn mentions_link_to_github_profiles() {
        assert_eq!(
            render("ping @octocat"),
            "<p>ping <a href=\"https://www.github.com/octocat\">@octocat</a></p>\n"
        );
        assert!(render("@rust-lang.").contains(r#"href="https://www.github.com/rust-lang">@rust-lang</a>."#));
        assert!(!render("mail me@example.com").contains("<a "));
        assert!(!render("`@octocat`").contains("<a "));
    }

    #[test]
    fn trailing_whitespace_renders_identically() {
        assert_eq!(render("# A"), render("# A   "));
    }

    #[test]
    fn single_newline_is_a_line_break() {
        let html = render("first\nsecond");
        assert!(html.contains("first<br />"), "{html}");
    }

    #[test]
    fn github_extensions_are_enabled() {
        assert!(render("~~gone~~").contains("<del>gone</del>"));
        assert!(render("- [x] done").contains("type=\"checkbox\""));
        assert!(render("| a | b |\n|---|---|\n| 1 | 2 |").contains("<table>"));
    }

    #[test]
    fn links_bare_urls_without_trailing_punctuation() {
        let html = render("visit https://example.com/docs.");
        assert!(
            html.contains(r#"<a href="https://example.com/docs">https://example.com/docs</a>."#),
            "{html}"
        );
    }

    #[test]
    fn www_urls_get_a_scheme() {
        let html = render("see www.rust-lang.org today");
        assert!(html.contains(r#"href="http://www.rust-lang.org""#), "{html}");
    }

    #[test]
    fn keeps_balanced_parentheses_in_urls() {
        let html = render("(https://en.wikipedia.org/wiki/Rust_(programming_language))");
        assert!(html.contains("programming_language)</a>)"), "{html}");
    }

    #[test]
    fn code_and_links_are_left_alone() {
        let fenced = render("```\nhttps://example.com :rocket:\n```");
        assert!(!fenced.contains("<a "), "{fenced}");
        assert!(fenced.contains(":rocket:"), "{fenced}");

        let inline = render("`https://example.com`");
        assert!(!inline.contains("<a "), "{inline}");

        let linked = render("[docs](https://example.com)");
        assert_eq!(linked.matches("<a ").count(), 1, "{linked}");
    }

    #[test]
    fn replaces_known_shortcodes_only() {
        let html = render("launch :rocket: then :not_an_emoji:");
        assert!(html.contains("launch 🚀 then :not_an_emoji:"), "{html}");

        let html = render(":smile_cat: :joy_cat: :see_no_evil: :checkered_flag: :+1:");
        assert!(html.contains("😸 😹 🙈 🏁 👍"), "{html}");
    }

    #[test]
    fn urls_inside_inline_anchors_are_not_linked_again() {
        let html = render("<a href=\"/x\">https://example.com @octocat</a> and https://rust-lang.org");
        assert_eq!(html.matches("<a ").count(), 2, "{html}");
        assert!(html.contains(r#"<a href="/x">https://example.com @octocat</a>"#), "{html}");
        assert!(html.contains(r#"<a href="https://rust-lang.org">"#), "{html}");
    }
}
