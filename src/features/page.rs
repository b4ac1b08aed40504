use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::lexical::netloc;

static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Raw body of a successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: Vec<u8>,
}

/// Line-level statistics of the raw page source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub line_count: usize,
    pub largest_line: usize,
}

impl LineStats {
    pub fn from_body(body: &[u8]) -> Self {
        let lines = split_lines(body);
        let largest_line = lines
            .iter()
            .map(|l| String::from_utf8_lossy(l).chars().count())
            .max()
            .unwrap_or(0);
        LineStats {
            line_count: lines.len(),
            largest_line,
        }
    }
}

/// Split on `\r\n`, `\n` or `\r`. A trailing terminator does not open a new line.
fn split_lines(body: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < body.len() {
        match body[i] {
            b'\n' => {
                lines.push(&body[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&body[start..i]);
                if body.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if start < body.len() {
        lines.push(&body[start..]);
    }
    lines
}

/// Element counts from the parsed HTML document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkupStats {
    pub images: usize,
    pub external_refs: usize,
}

impl MarkupStats {
    /// `page_host` is the network location of the page URL; an anchor is
    /// external when its own network location differs from it.
    pub fn from_document(doc: &Html, page_host: &str) -> Self {
        let images = doc.select(&IMG_SEL).count();
        let external_refs = doc
            .select(&ANCHOR_SEL)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| netloc(href) != page_host)
            .count();

        MarkupStats {
            images,
            external_refs,
        }
    }
}
