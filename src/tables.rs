use std::collections::HashMap;
use std::sync::LazyLock;

/// Factor number → one-character label, indexed by `code - 1`.
const FACTOR_SHORT: [&str; 12] = [
    "短", "速", "底", "長", "適", "丈", "早", "晩", "堅", "難", "走", "中",
];

pub fn factor_short(code: u32) -> Option<&'static str> {
    let idx = usize::try_from(code).ok()?.checked_sub(1)?;
    FACTOR_SHORT.get(idx).copied()
}

const LINEAGE_CODES: &[(&str, &str)] = &[
    ("エクリプス系", "Ec"),
    ("フェアウェイ系", "Fa"),
    ("フェアトライアル系", "Fa"),
    ("オーエンテューダー系", "Ha"),
    ("オリオール系", "Ha"),
    ("カーレッド系", "Ha"),
    ("サンインロー系", "Ha"),
    ("ハイペリオン系", "Ha"),
    ("ハンプトン系", "Ha"),
    ("ファイントップ系", "Ha"),
    ("ロックフェラ系", "Ha"),
    ("クラリオン系", "He"),
    ("トウルビヨン系", "He"),
    ("ヘロド系", "He"),
    ("マイバブー系", "He"),
    ("ヒムヤー系", "Hi"),
    ("インテント系", "Ma"),
    ("マッチェム系", "Ma"),
    ("マンノウォー系", "Ma"),
    ("レリック系", "Ma"),
    ("エタン系", "Na"),
    ("ネイティヴダンサー系", "Na"),
    ("レイズアネイティヴ系", "Na"),
    ("ニアークティック系", "Ne"),
    ("ノーザンダンサー系", "Ne"),
    ("グレイソヴリン系", "Ns"),
    ("ゼダーン系", "Ns"),
    ("ソヴリンパス系", "Ns"),
    ("ナスルーラ系", "Ns"),
    ("ネヴァーセイダイ系", "Ns"),
    ("ネヴァーベンド系", "Ns"),
    ("フォルティノ系", "Ns"),
    ("プリンスリーギフト系", "Ns"),
    ("ボールドルーラー系", "Ns"),
    ("レッドゴッド系", "Ns"),
    ("ダンテ系", "Ph"),
    ("ネアルコ系", "Ph"),
    ("ファロス系", "Ph"),
    ("ファラリス系", "Ph"),
    ("ファリス系", "Ph"),
    ("モスボロー系", "Ph"),
    ("サーゲイロード系", "Ro"),
    ("ハビタット系", "Ro"),
    ("ヘイルトゥリーズン系", "Ro"),
    ("ロイヤルチャージャー系", "Ro"),
    ("セントサイモン系", "St"),
    ("プリンスキロ系", "St"),
    ("プリンスビオ系", "St"),
    ("プリンスローズ系", "St"),
    ("ボワルセル系", "St"),
    ("リボー系", "St"),
    ("ワイルドリスク系", "St"),
    ("スインフォード系", "Sw"),
    ("ブラントーム系", "Sw"),
    ("ブランドフォード系", "Sw"),
    ("ブレニム系", "Sw"),
    ("テディ系", "Te"),
    ("トムフール系", "To"),
];

static LINEAGE_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| LINEAGE_CODES.iter().copied().collect());

/// Exact-match lookup of a trimmed lineage label.
pub fn lineage_code(label: &str) -> Option<&'static str> {
    LINEAGE_MAP.get(label).copied()
}
