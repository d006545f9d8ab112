use serde::ser::{Serialize, SerializeMap, Serializer};

/// Legacy "ALL sheet" column numbers (1-based). Fixed for output compatibility.
pub mod layout {
    pub const GENDER: usize = 1;
    pub const SERIAL_NUMBER: usize = 2;
    pub const HORSE_ID: usize = 3;
    pub const RARE: usize = 4;
    pub const HORSE_NAME: usize = 5;
    pub const PARENT_LINE: usize = 6;
    pub const FACTOR_NAME1: usize = 7;
    pub const FACTOR_NAME2: usize = 8;
    pub const FACTOR_NAME3: usize = 9;
    pub const ICON: usize = 10;
    pub const DISTANCE_MIN: usize = 11;
    pub const DISTANCE_MAX: usize = 12;
    pub const GROWTH: usize = 13;
    pub const DIRT: usize = 14;
    pub const HEALTH: usize = 15;
    pub const CLEMENCY: usize = 16;
    pub const RUNNING_STYLE: usize = 17;
    pub const ACHIEVEMENT: usize = 18;
    pub const POTENTIAL: usize = 19;
    pub const STABLE: usize = 20;
    pub const ABILITY: usize = 21;
    pub const NATURE: usize = 22;
    /// First of 45 pedigree-name slots.
    pub const NAME_T: usize = 23;
    pub const PARENT_LINE_T: usize = 38;
    pub const SON_T: usize = 53;
    /// First of 45 descendant factor-image slots (15 descendants x 3).
    pub const FACTOR_T1: usize = 68;

    pub const ROW_SIZE: usize = 112;
    pub const PEDIGREE_SLOTS: usize = 45;
    pub const DESCENDANTS: usize = 15;

    /// Gender flag values written by the two parsers.
    pub const MALE: &str = "0";
    pub const FEMALE: &str = "1";
}

/// One subject's worth of legacy columns. Index 0 is never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBuffer {
    slots: Vec<String>,
}

impl Default for RowBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RowBuffer {
    pub fn new() -> Self {
        RowBuffer {
            slots: vec![String::new(); layout::ROW_SIZE + 1],
        }
    }

    /// Bounds-checked read; anything outside the layout reads as "".
    pub fn get(&self, idx: usize) -> &str {
        self.slots.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Writes outside the layout are dropped.
    pub fn set(&mut self, idx: usize, value: impl Into<String>) {
        if let Some(slot) = self.slots.get_mut(idx) {
            *slot = value.into();
        }
    }

    pub fn is_male(&self) -> bool {
        self.get(layout::GENDER) == layout::MALE
    }

    /// Non-empty slots in column order, for the debug stream.
    pub fn filled(&self) -> impl Iterator<Item = (usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, v)| !v.is_empty())
            .map(|(i, v)| (i, v.as_str()))
    }

    pub fn sparse(&self) -> SparseRow<'_> {
        SparseRow(self)
    }
}

/// Serializes as `{"1":"0","2":"00001",...}` keeping numeric column order.
pub struct SparseRow<'a>(&'a RowBuffer);

impl Serialize for SparseRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (idx, value) in self.0.filled() {
            map.serialize_entry(&idx.to_string(), value)?;
        }
        map.end()
    }
}
