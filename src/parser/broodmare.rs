use scraper::Html;

use super::dom::{self, Field, Step::*};
use super::{base_row, fill_pedigree_and_factors, wrapper, DetailParser};
use crate::row::{layout, RowBuffer};

/// Female-line detail page. The layout differs from the stallion page: all
/// fields hang off the detail div, and there is no exclusion rule.
pub struct BroodmareParser;

impl DetailParser for BroodmareParser {
    fn parse(&self, url: &str, serial_no: usize, doc: &Html) -> Option<RowBuffer> {
        let detail = dom::child(wrapper(doc)?, "div")?;

        let mut row = base_row(layout::FEMALE, url, serial_no);
        if let Some(rare) = dom::extract_field(detail, &[Nth("p", 3)], Field::Text) {
            row.set(layout::RARE, rare);
        }

        let table = dom::child(detail, "table")?;
        let first_tr = dom::resolve(table, &[Nth("tr", 0)])?;
        let tds = dom::find_all(first_tr, "td");
        if let Some(&td) = tds.get(1) {
            row.set(
                layout::HORSE_NAME,
                dom::extract_field(td, &[Nth("span", 0)], Field::Text).unwrap_or_default(),
            );
        }
        if let Some(&td) = tds.first() {
            row.set(
                layout::ICON,
                dom::extract_field(td, &[Nth("img", 0)], Field::Src).unwrap_or_default(),
            );
        }

        row.set(
            layout::PARENT_LINE,
            dom::extract_field(detail, &[Child("div")], Field::Text).unwrap_or_default(),
        );

        fill_pedigree_and_factors(&mut row, doc);
        Some(row)
    }
}
