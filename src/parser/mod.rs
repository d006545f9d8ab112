pub mod broodmare;
pub mod dom;
pub mod stallion;

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::row::{layout, RowBuffer};
use broodmare::BroodmareParser;
use stallion::StallionParser;

static CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#content").unwrap());
static HORSE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".horse").unwrap());
static FACTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".factor").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

/// Turns one detail page into a row, or declines it with `None`.
pub trait DetailParser {
    fn parse(&self, url: &str, serial_no: usize, doc: &Html) -> Option<RowBuffer>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    /// Male line.
    Stallion,
    /// Female line.
    Broodmare,
}

impl SubjectKind {
    pub fn from_url(url: &str) -> Self {
        if url.contains("/broodmares/") {
            SubjectKind::Broodmare
        } else {
            SubjectKind::Stallion
        }
    }
}

/// Both page parsers, picked per URL.
pub struct Parsers {
    stallion: StallionParser,
    broodmare: BroodmareParser,
}

impl Parsers {
    pub fn new(skip_icons: HashSet<String>) -> Self {
        Parsers {
            stallion: StallionParser::new(skip_icons),
            broodmare: BroodmareParser,
        }
    }

    pub fn parse_page(&self, url: &str, serial_no: usize, html: &str) -> Option<RowBuffer> {
        let doc = Html::parse_document(html);
        let parser: &dyn DetailParser = match SubjectKind::from_url(url) {
            SubjectKind::Stallion => &self.stallion,
            SubjectKind::Broodmare => &self.broodmare,
        };
        parser.parse(url, serial_no, &doc)
    }
}

/// `#content` → wrapper div. Both page layouts hang off this.
fn wrapper(doc: &Html) -> Option<ElementRef<'_>> {
    let content = doc.select(&CONTENT).next()?;
    dom::child(content, "div")
}

/// Row with the identifying columns every subject carries.
fn base_row(gender: &str, url: &str, serial_no: usize) -> RowBuffer {
    let mut row = RowBuffer::new();
    row.set(layout::GENDER, gender);
    row.set(layout::SERIAL_NUMBER, format!("{:05}", serial_no));
    row.set(layout::HORSE_ID, url);
    row
}

/// Pedigree names and descendant factor images; anything past 45 is dropped.
fn fill_pedigree_and_factors(row: &mut RowBuffer, doc: &Html) {
    for (i, el) in doc.select(&HORSE).take(layout::PEDIGREE_SLOTS).enumerate() {
        row.set(layout::NAME_T + i, dom::text_of(el));
    }
    for (i, el) in doc.select(&FACTOR).take(layout::PEDIGREE_SLOTS).enumerate() {
        let src = el.select(&IMG).next().map(dom::src_of).unwrap_or_default();
        row.set(layout::FACTOR_T1 + i, src);
    }
}
