use crate::error::{AskblogError, Result};
use crate::ingest::Document;
use scraper::{Html, Selector};

/// Block-level elements whose text makes up the readable body of a post.
/// Script/style/nav content never matches and is dropped for free.
const BLOCK_SELECTOR: &str = "article p, article li, article pre, article blockquote, \
     article h1, article h2, article h3, article h4, \
     main p, main li, main pre, main blockquote, \
     main h1, main h2, main h3, main h4";

/// Fallback when the page has no article/main landmark
const FALLBACK_SELECTOR: &str = "body p, body li, body pre, body blockquote, \
     body h1, body h2, body h3, body h4";

/// Extract a readable text Document from a post's HTML.
///
/// Joins block-level text with blank lines so paragraph boundaries survive
/// for the chunker. Fails with a parse error if no readable text is found;
/// the caller decides whether that drops the URL or aborts the batch.
pub fn extract_document(url: &str, html: &str) -> Result<Document> {
    let dom = Html::parse_document(html);

    let title_selector = selector("title")?;
    let title = dom
        .select(&title_selector)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let mut text = collect_blocks(&dom, BLOCK_SELECTOR)?;
    if text.is_empty() {
        text = collect_blocks(&dom, FALLBACK_SELECTOR)?;
    }

    if text.is_empty() {
        return Err(AskblogError::Parse(format!(
            "No readable text extracted from {}",
            url
        )));
    }

    Ok(Document {
        url: url.to_string(),
        title,
        text,
    })
}

fn collect_blocks(dom: &Html, css: &str) -> Result<String> {
    let block_selector = selector(css)?;
    let blocks: Vec<String> = dom
        .select(&block_selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect();
    Ok(blocks.join("\n\n"))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AskblogError::Parse(format!("Invalid selector {}: {}", css, e)))
}

/// Collapse runs of whitespace (including newlines inside a block) to single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_article_text_and_title() {
        let html = r#"
            <html><head><title>  My Post — Blog  </title>
            <script>var tracking = "noise";</script></head>
            <body><nav><p>Menu item</p></nav>
            <article>
              <h1>My Post</h1>
              <p>First   paragraph
                 spanning lines.</p>
              <p>Second paragraph.</p>
            </article></body></html>"#;

        let doc = extract_document("https://blog.example.com/post", html).unwrap();
        assert_eq!(doc.url, "https://blog.example.com/post");
        assert_eq!(doc.title.as_deref(), Some("My Post — Blog"));
        assert_eq!(
            doc.text,
            "My Post\n\nFirst paragraph spanning lines.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_nav_text_excluded_when_article_present() {
        let html = r#"<body><nav><p>Home</p></nav>
            <article><p>Real content.</p></article></body>"#;
        let doc = extract_document("u", html).unwrap();
        assert!(!doc.text.contains("Home"));
    }

    #[test]
    fn test_falls_back_to_body_blocks() {
        let html = "<body><p>Plain page paragraph.</p></body>";
        let doc = extract_document("u", html).unwrap();
        assert_eq!(doc.text, "Plain page paragraph.");
        assert!(doc.title.is_none());
    }

    #[test]
    fn test_empty_page_is_parse_error() {
        let err = extract_document("https://x/post", "<body><div></div></body>").unwrap_err();
        assert!(matches!(err, AskblogError::Parse(_)));
        assert!(err.to_string().contains("https://x/post"));
    }
}
