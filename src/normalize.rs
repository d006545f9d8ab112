use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::tables;
use crate::urls::BASE_URL;

static NON_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\D").unwrap());
// Four-character year ("2005") or a kanji pair ("因子") tacked onto the display name.
static SUB_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]...|[一-龠].").unwrap());
static SITE: LazyLock<Url> = LazyLock::new(|| Url::parse(BASE_URL).unwrap());

/// Keep only the digit characters of `text`.
pub fn extract_digits(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    NON_DIGIT_RE.replace_all(text, "").into_owned()
}

/// Make an image/link reference absolute against the site.
pub fn normalize_reference(value: &str) -> String {
    let src = value.trim();
    if src.is_empty() {
        String::new()
    } else if src.starts_with('/') {
        // Covers "//host/..." too; dot segments are resolved.
        match SITE.join(src) {
            Ok(url) => url.into(),
            Err(_) if src.starts_with("//") => format!("https:{}", src),
            Err(_) => format!("{}{}", BASE_URL, src),
        }
    } else {
        src.to_string()
    }
}

/// Generic 2-character lineage code, used when the label is not in the map.
pub fn shorten_lineage_code(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }
    s.replace("Nas", "Ns")
        .replace("Nat", "Na")
        .chars()
        .take(2)
        .collect()
}

/// Map lookup first, truncation fallback otherwise.
pub fn lineage_code(raw: &str) -> String {
    match tables::lineage_code(raw.trim()) {
        Some(code) => code.to_string(),
        None => shorten_lineage_code(raw),
    }
}

/// Split a display name into `(name, sub_name)`.
///
/// The first match of a digit followed by any three characters, or of a kanji
/// followed by one more character, is taken as the suffix. Names that
/// legitimately contain digits or kanji will be split too; that is a known
/// limitation of the heuristic.
pub fn split_name_suffix(raw: &str) -> (String, String) {
    match SUB_NAME_RE.find(raw) {
        Some(m) => {
            let suffix = m.as_str();
            let name = raw.replace(suffix, "").replace('-', "");
            (name, suffix.to_string())
        }
        None => (raw.to_string(), String::new()),
    }
}

/// Right-align up to three factor references and reduce each to its number.
///
/// One reference lands in slot 3, two in slots 2–3, three in slots 1–3.
pub fn resolve_factor_triple(r1: &str, r2: &str, r3: &str) -> [String; 3] {
    if !r3.is_empty() {
        [extract_digits(r1), extract_digits(r2), extract_digits(r3)]
    } else if !r2.is_empty() {
        [String::new(), extract_digits(r1), extract_digits(r2)]
    } else if !r1.is_empty() {
        [String::new(), String::new(), extract_digits(r1)]
    } else {
        Default::default()
    }
}

/// Factor number string → one-character label, or "" when unknown.
///
/// Full-width digits count the same as ASCII ones.
pub fn factor_label(code: &str) -> String {
    code.chars()
        .map(ascii_digit)
        .collect::<Option<String>>()
        .and_then(|digits| digits.parse::<u32>().ok())
        .and_then(tables::factor_short)
        .unwrap_or_default()
        .to_string()
}

fn ascii_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32),
        _ => None,
    }
}

pub fn factor_labels(r1: &str, r2: &str, r3: &str) -> [String; 3] {
    resolve_factor_triple(r1, r2, r3).map(|code| factor_label(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    const F1: &str = "https://cf.dabimas.jp/kouryaku/images/factor/icn_factor_01.png";
    const F6: &str = "https://cf.dabimas.jp/kouryaku/images/factor/icn_factor_06.png";
    const F12: &str = "https://cf.dabimas.jp/kouryaku/images/factor/icn_factor_12.png";

    #[test]
    fn digits_only() {
        assert_eq!(extract_digits("icn_factor_06.png"), "06");
        assert_eq!(extract_digits("abc"), "");
        assert_eq!(extract_digits(""), "");
    }

    #[test]
    fn digits_idempotent() {
        for s in ["a1b2c3", "", "no digits", "2005年", F12] {
            let once = extract_digits(s);
            assert_eq!(extract_digits(&once), once);
        }
    }

    #[test]
    fn reference_forms() {
        assert_eq!(normalize_reference("//cf.dabimas.jp/a.png"), "https://cf.dabimas.jp/a.png");
        assert_eq!(
            normalize_reference("/kouryaku/images/a.png"),
            "https://dabimas.jp/kouryaku/images/a.png"
        );
        assert_eq!(normalize_reference(F1), F1);
        assert_eq!(normalize_reference("/kouryaku/a/../b.png"), "https://dabimas.jp/kouryaku/b.png");
        assert_eq!(normalize_reference("/a/./b.png"), "https://dabimas.jp/a/b.png");
        assert_eq!(normalize_reference("  "), "");
        assert_eq!(normalize_reference(""), "");
    }

    #[test]
    fn lineage_from_map() {
        assert_eq!(lineage_code("ハンプトン系"), "Ha");
        assert_eq!(lineage_code("  ナスルーラ系 "), "Ns");
    }

    #[test]
    fn lineage_fallback() {
        assert_eq!(lineage_code("Nasruddin系"), "Ns");
        assert_eq!(lineage_code("Native系"), "Na");
        assert_eq!(lineage_code("Roberto系"), "Ro");
        assert_eq!(lineage_code(""), "");
    }

    #[test]
    fn shorten_counts_chars_not_bytes() {
        assert_eq!(shorten_lineage_code("未知の系統"), "未知");
        assert_eq!(shorten_lineage_code("X"), "X");
    }

    #[test]
    fn split_year_suffix() {
        let (name, sub) = split_name_suffix("ディープインパクト2005");
        assert_eq!(name, "ディープインパクト");
        assert_eq!(sub, "2005");
    }

    #[test]
    fn split_kanji_suffix() {
        let (name, sub) = split_name_suffix("サンデーサイレンス-因子");
        assert_eq!(name, "サンデーサイレンス");
        assert_eq!(sub, "因子");
    }

    #[test]
    fn split_takes_digit_and_three_chars() {
        assert_eq!(
            split_name_suffix("シンボリ2005年"),
            ("シンボリ年".to_string(), "2005".to_string())
        );
    }

    #[test]
    fn short_digit_run_is_not_a_suffix() {
        assert_eq!(
            split_name_suffix("キタサン12"),
            ("キタサン12".to_string(), String::new())
        );
    }

    #[test]
    fn kanji_pair_wins_over_short_digit_run() {
        assert_eq!(
            split_name_suffix("ナリタ3冠馬"),
            ("ナリタ3".to_string(), "冠馬".to_string())
        );
    }

    #[test]
    fn split_no_suffix() {
        let (name, sub) = split_name_suffix("ノーザンダンサー");
        assert_eq!(name, "ノーザンダンサー");
        assert_eq!(sub, "");
    }

    #[test]
    fn hyphen_kept_without_suffix() {
        let (name, sub) = split_name_suffix("ア-イ");
        assert_eq!(name, "ア-イ");
        assert_eq!(sub, "");
    }

    #[test]
    fn triple_right_aligned() {
        assert_eq!(resolve_factor_triple(F1, "", ""), ["", "", "01"]);
        assert_eq!(resolve_factor_triple(F1, F6, ""), ["", "01", "06"]);
        assert_eq!(resolve_factor_triple(F1, F6, F12), ["01", "06", "12"]);
        assert_eq!(resolve_factor_triple("", "", ""), ["", "", ""]);
    }

    #[test]
    fn labels() {
        assert_eq!(factor_label("01"), "短");
        assert_eq!(factor_label("12"), "中");
        assert_eq!(factor_label("13"), "");
        assert_eq!(factor_label("0"), "");
        assert_eq!(factor_label(""), "");
        assert_eq!(factor_label("99999999999999999999"), "");
        assert_eq!(factor_labels(F6, F12, ""), ["", "丈", "中"]);
    }

    #[test]
    fn full_width_factor_digits() {
        assert_eq!(factor_label("０１"), "短");
        assert_eq!(factor_label("1２"), "中");
        assert_eq!(factor_labels("icn_factor_０６.png", "", ""), ["", "", "丈"]);
    }
}
