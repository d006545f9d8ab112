use std::collections::HashSet;

use scraper::{ElementRef, Html};
use tracing::debug;

use super::dom::{self, Field, Step::*};
use super::{base_row, fill_pedigree_and_factors, wrapper, DetailParser};
use crate::row::{layout, RowBuffer};

const MAX_RARITY: usize = 5;

/// Status-image cells: (cell index, column). Row 0 then row 1 of the detail table.
const ROW0_IMAGE_CELLS: [(usize, usize); 3] = [
    (2, layout::DIRT),
    (3, layout::HEALTH),
    (4, layout::CLEMENCY),
];
const ROW1_IMAGE_CELLS: [(usize, usize); 3] = [
    (1, layout::ACHIEVEMENT),
    (2, layout::POTENTIAL),
    (3, layout::STABLE),
];

/// Male-line detail page.
pub struct StallionParser {
    /// Icons that exclude a non-max-rarity stallion. Empty unless configured.
    skip_icons: HashSet<String>,
}

impl StallionParser {
    pub fn new(skip_icons: HashSet<String>) -> Self {
        StallionParser { skip_icons }
    }
}

impl DetailParser for StallionParser {
    fn parse(&self, url: &str, serial_no: usize, doc: &Html) -> Option<RowBuffer> {
        // #content > div (wrapper) > div (detail) + table (main)
        let wrapper = wrapper(doc)?;
        let detail = dom::child(wrapper, "div");
        let main_table = dom::child(wrapper, "table")?;

        let trs = dom::find_all(main_table, "tr");
        if trs.len() < 3 {
            return None;
        }
        let row0_tds = dom::find_all(trs[0], "td");
        let row1_tds = dom::find_all(trs[1], "td");
        if row0_tds.len() < 2 || row1_tds.is_empty() {
            return None;
        }

        let star_count = dom::descendants(row0_tds[1], "img").count();
        let icon = dom::extract_field(row1_tds[0], &[Nth("img", 0)], Field::Src).unwrap_or_default();
        if star_count != MAX_RARITY && self.skip_icons.contains(&icon) {
            debug!("Skipping {}: excluded icon {}", url, icon);
            return None;
        }

        let mut row = base_row(layout::MALE, url, serial_no);
        row.set(layout::RARE, star_count.to_string());
        row.set(layout::ICON, icon);
        row.set(
            layout::HORSE_NAME,
            dom::extract_field(trs[1], &[Nth("span", 0)], Field::Text).unwrap_or_default(),
        );
        row.set(
            layout::PARENT_LINE,
            dom::extract_field(trs[2], &[Nth("div", 0)], Field::Text).unwrap_or_default(),
        );

        // Top-level factors: up to 3 images in the first div of the rarity cell.
        if let Some(factor_div) = dom::resolve(row0_tds[1], &[Nth("div", 0)]) {
            let factor_cols = [layout::FACTOR_NAME1, layout::FACTOR_NAME2, layout::FACTOR_NAME3];
            for (col, img) in factor_cols.into_iter().zip(dom::descendants(factor_div, "img")) {
                row.set(col, dom::src_of(img));
            }
        }

        if let Some(detail) = detail {
            fill_detail(&mut row, detail);
        }

        fill_pedigree_and_factors(&mut row, doc);
        Some(row)
    }
}

/// Ability, the status table and nature, all under the detail div.
fn fill_detail(row: &mut RowBuffer, detail: ElementRef<'_>) {
    let anchors = dom::find_all(detail, "a");
    let first_p = |a: ElementRef<'_>| dom::extract_field(a, &[Nth("p", 0)], Field::Text);

    row.set(
        layout::ABILITY,
        anchors.first().copied().and_then(first_p).unwrap_or_default(),
    );

    if let Some(table) = dom::child(detail, "table") {
        let drows = dom::find_all(table, "tr");
        if drows.len() >= 2 {
            let c0 = dom::find_all(drows[0], "td");
            let c1 = dom::find_all(drows[1], "td");

            for (cells, idx, col) in [
                (&c0, 0, layout::DISTANCE_MIN),
                (&c0, 1, layout::GROWTH),
                (&c1, 0, layout::RUNNING_STYLE),
            ] {
                if let Some(&cell) = cells.get(idx) {
                    row.set(col, first_p(cell).unwrap_or_default());
                }
            }

            for (cells, columns) in [(&c0, &ROW0_IMAGE_CELLS), (&c1, &ROW1_IMAGE_CELLS)] {
                for &(idx, col) in columns {
                    let Some(&cell) = cells.get(idx) else { continue };
                    // Second div of the cell holds the status image.
                    if dom::descendants(cell, "div").nth(1).is_some() {
                        row.set(
                            col,
                            dom::extract_field(cell, &[Nth("div", 1), Nth("img", 0)], Field::Src)
                                .unwrap_or_default(),
                        );
                    }
                }
            }
        }
    }

    // Nature moves between the second and first anchor depending on the page.
    if dom::descendants(detail, "h4").nth(1).is_some() {
        let anchor = anchors.get(1).or_else(|| anchors.first()).copied();
        if let Some(nature) = anchor.and_then(first_p) {
            row.set(layout::NATURE, nature);
        }
    }
}
