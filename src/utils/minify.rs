//! Minification of generated HTML, inline CSS and inline JS.
//!
//! All three go through `minify_html`. CSS and JS are wrapped in their
//! element, minified as a document fragment and unwrapped again.

use std::borrow::Cow;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyKind {
    Html,
    Css,
    Js,
}

/// Output minifier, identity when disabled.
#[derive(Debug, Clone, Copy)]
pub struct Minifier {
    enabled: bool,
}

impl Minifier {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Returns `Cow::Borrowed` if minification is disabled.
    pub fn minify<'a>(&self, kind: MinifyKind, text: &'a str) -> Cow<'a, str> {
        if !self.enabled {
            return Cow::Borrowed(text);
        }
        Cow::Owned(match kind {
            MinifyKind::Html => minify_html_inner(text),
            MinifyKind::Css => minify_wrapped(text, "style"),
            MinifyKind::Js => minify_wrapped(text, "script"),
        })
    }
}

// ============================================================================
// Internal Implementation
// ============================================================================

fn config() -> minify_html::Cfg {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    cfg
}

fn minify_html_inner(html: &str) -> String {
    let out = minify_html::minify(html.as_bytes(), &config());
    String::from_utf8(out).unwrap_or_else(|_| html.to_owned())
}

/// Minify `text` as the body of a `<tag>` element.
fn minify_wrapped(text: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let wrapped = format!("{open}{text}{close}");

    let out = minify_html_inner(&wrapped);
    out.trim()
        .strip_prefix(&open)
        .and_then(|rest| rest.strip_suffix(&close))
        .map_or_else(|| text.trim().to_owned(), str::to_owned)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_html_basic() {
        let html = "<html>\n  <head>\n  </head>\n  <body>\n    <p>Hello</p>\n  </body>\n</html>";
        let result = Minifier::new(true).minify(MinifyKind::Html, html);

        assert!(!result.contains("\n  "));
        assert!(result.contains("<p>Hello</p>"));
    }

    #[test]
    fn test_minify_html_drops_comments() {
        let result = Minifier::new(true).minify(MinifyKind::Html, "<p>a<!-- note --></p>");
        assert!(!result.contains("note"));
        assert!(result.contains("<p>a</p>"));
    }

    #[test]
    fn test_minify_disabled_is_identity() {
        let html = "<html>\n  <body>\n  </body>\n</html>";
        let minifier = Minifier::new(false);

        for kind in [MinifyKind::Html, MinifyKind::Css, MinifyKind::Js] {
            assert!(matches!(minifier.minify(kind, html), Cow::Borrowed(s) if s == html));
        }
    }

    #[test]
    fn test_minify_css() {
        let css = "body {\n  color: red;\n}\n\n.card {\n  margin: 0px;\n}\n";
        let result = Minifier::new(true).minify(MinifyKind::Css, css);

        assert!(!result.contains('\n'));
        assert!(!result.contains("<style>"));
        assert!(result.contains("color:red"));
        assert!(result.len() < css.len());
    }

    #[test]
    fn test_minify_js() {
        let js = "const answer = 40 + 2;\n\nconsole.log( answer );\n";
        let result = Minifier::new(true).minify(MinifyKind::Js, js);

        assert!(!result.contains("<script>"));
        assert!(result.contains("console.log"));
        assert!(result.len() < js.len());
    }
}
