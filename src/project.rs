use serde::{Deserialize, Serialize};

use crate::normalize::{factor_labels, lineage_code, shorten_lineage_code, split_name_suffix};
use crate::row::{layout, RowBuffer};

/// One element of `horseLists`. Every key is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseEntry {
    pub name: String,
    pub sub_name: String,
    pub nature: String,
    pub sex: String,
    pub parent_line: String,
    pub son: String,
    pub factors: [String; 3],
    pub descendants: Vec<Descendant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descendant {
    pub name: String,
    pub parent_line: String,
    pub son: String,
    pub factors: [String; 3],
}

pub fn project(row: &RowBuffer) -> HorseEntry {
    let (name, sub_name) = split_name_suffix(row.get(layout::HORSE_NAME));
    let parent_line_raw = row.get(layout::PARENT_LINE);

    let descendants = (0..layout::DESCENDANTS)
        .map(|i| {
            let factor = |k: usize| row.get(layout::FACTOR_T1 + i * 3 + k);
            Descendant {
                name: row.get(layout::NAME_T + i).to_string(),
                parent_line: shorten_lineage_code(row.get(layout::PARENT_LINE_T + i)),
                son: row.get(layout::SON_T + i).to_string(),
                factors: factor_labels(factor(0), factor(1), factor(2)),
            }
        })
        .collect();

    HorseEntry {
        name,
        sub_name,
        nature: row.get(layout::NATURE).to_string(),
        sex: row.get(layout::GENDER).to_string(),
        parent_line: lineage_code(parent_line_raw),
        son: parent_line_raw.to_string(),
        factors: factor_labels(
            row.get(layout::FACTOR_NAME1),
            row.get(layout::FACTOR_NAME2),
            row.get(layout::FACTOR_NAME3),
        ),
        descendants,
    }
}
