//! The markdown renderer seam.

/// Renders markdown source to an HTML fragment.
///
/// The output is an intermediate form: the dispatcher wraps it in a page
/// template before it reaches the client.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> String;
}

impl<T: MarkdownRenderer + ?Sized> MarkdownRenderer for std::sync::Arc<T> {
    fn render(&self, source: &str) -> String {
        self.as_ref().render(source)
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Block-level markdown: ATX headings, paragraphs, bullet lists and fenced
/// code. Inline markup is escaped, not interpreted.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicMarkdown;

#[derive(PartialEq)]
enum Block {
    None,
    Paragraph,
    List,
    Code,
}

impl BasicMarkdown {
    pub fn new() -> Self {
        Self
    }

    fn close(block: &mut Block, out: &mut String) {
        match block {
            Block::Paragraph => out.push_str("</p>\n"),
            Block::List => out.push_str("</ul>\n"),
            Block::Code => out.push_str("</code></pre>\n"),
            Block::None => {}
        }
        *block = Block::None;
    }

    fn heading(line: &str) -> Option<(usize, &str)> {
        let level = line.chars().take_while(|&c| c == '#').count();
        if level == 0 || level > 6 {
            return None;
        }
        let text = line[level..].strip_prefix(' ')?;
        Some((level, text.trim()))
    }
}

impl MarkdownRenderer for BasicMarkdown {
    fn render(&self, source: &str) -> String {
        let mut out = String::new();
        let mut block = Block::None;

        for line in source.lines() {
            if block == Block::Code {
                if line.trim_start().starts_with("```") {
                    Self::close(&mut block, &mut out);
                } else {
                    out.push_str(&escape_html(line));
                    out.push('\n');
                }
                continue;
            }

            let trimmed = line.trim();
            if trimmed.starts_with("```") {
                Self::close(&mut block, &mut out);
                out.push_str("<pre><code>");
                block = Block::Code;
            } else if trimmed.is_empty() {
                Self::close(&mut block, &mut out);
            } else if let Some((level, text)) = Self::heading(trimmed) {
                Self::close(&mut block, &mut out);
                out.push_str(&format!("<h{level}>{}</h{level}>\n", escape_html(text)));
            } else if let Some(item) = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
            {
                if block != Block::List {
                    Self::close(&mut block, &mut out);
                    out.push_str("<ul>\n");
                    block = Block::List;
                }
                out.push_str(&format!("<li>{}</li>\n", escape_html(item.trim())));
            } else {
                match block {
                    Block::Paragraph => out.push('\n'),
                    _ => {
                        Self::close(&mut block, &mut out);
                        out.push_str("<p>");
                        block = Block::Paragraph;
                    }
                }
                out.push_str(&escape_html(trimmed));
            }
        }

        Self::close(&mut block, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_paragraphs() {
        let html = BasicMarkdown.render("# Title\n\nFirst line\nsecond line\n\n## Sub\n");
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>First line\nsecond line</p>\n<h2>Sub</h2>\n"
        );
    }

    #[test]
    fn lists() {
        let html = BasicMarkdown.render("- one\n* two\n\nafter");
        assert_eq!(html, "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n<p>after</p>\n");
    }

    #[test]
    fn fenced_code_is_escaped_verbatim() {
        let html = BasicMarkdown.render("```\n# not a heading\n<b>\n```\n");
        assert_eq!(html, "<pre><code># not a heading\n&lt;b&gt;\n</code></pre>\n");
    }

    #[test]
    fn hash_without_space_is_text() {
        assert_eq!(BasicMarkdown.render("#tag"), "<p>#tag</p>\n");
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(
            BasicMarkdown.render("a < b & \"c\""),
            "<p>a &lt; b &amp; &quot;c&quot;</p>\n"
        );
    }

    #[test]
    fn empty_source_renders_nothing() {
        assert_eq!(BasicMarkdown.render(""), "");
    }
}
