use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;

use crate::fetch::PageSource;

pub const BASE_URL: &str = "https://dabimas.jp";
const STALLION_LIST_URL: &str = "https://dabimas.jp/kouryaku/stallions/name.html";
const BROODMARE_LIST_URL: &str = "https://dabimas.jp/kouryaku/broodmares/name.html";

static STALLION_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".stallion_list_panel > a[href]").unwrap());
static BROODMARE_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".list_panel.broodmare > a[href]").unwrap());
static DETAIL_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/kouryaku/(stallions|broodmares)/\d+\.html$").unwrap());
static ABSOLUTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());

/// Ordered, exact-string de-duplicated URL list.
#[derive(Default)]
struct UrlList {
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl UrlList {
    fn push(&mut self, url: String) {
        if self.seen.insert(url.clone()) {
            self.urls.push(url);
        }
    }
}

/// Collect stallion then broodmare detail URLs from the two list pages.
pub async fn collect_subject_urls(source: &dyn PageSource) -> Result<Vec<String>> {
    let mut list = UrlList::default();

    for (list_url, selector) in [
        (STALLION_LIST_URL, &*STALLION_LINKS),
        (BROODMARE_LIST_URL, &*BROODMARE_LINKS),
    ] {
        info!("Fetching list page: {}", list_url);
        let html = source
            .fetch_page(list_url)
            .await
            .with_context(|| format!("Failed to fetch list page {}", list_url))?;
        let before = list.urls.len();
        for href in detail_hrefs(&html, selector) {
            list.push(format!("{}{}", BASE_URL, href));
        }
        info!("{}: {} detail pages", list_url, list.urls.len() - before);
    }

    Ok(list.urls)
}

/// Hrefs under `selector` that look like a detail page path.
fn detail_hrefs(html: &str, selector: &Selector) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| DETAIL_PATH_RE.is_match(href))
        .map(str::to_string)
        .collect()
}

/// Read a URL list: one per line, `#` comments, `/path` resolved on the site.
pub fn load_urls_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    parse_url_lines(&text).with_context(|| format!("Invalid URL list {}", path.display()))
}

fn parse_url_lines(text: &str) -> Result<Vec<String>> {
    let mut list = UrlList::default();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let url = if line.starts_with('/') {
            format!("{}{}", BASE_URL, line)
        } else {
            line.to_string()
        };
        if !ABSOLUTE_RE.is_match(&url) {
            bail!("line {}: not a URL: {}", lineno + 1, line);
        }
        list.push(url);
    }

    Ok(list.urls)
}
