//! Canonical service-type vocabulary and synonym table.
//!
//! The table is the single source of truth: the query-understanding
//! prompt is rendered from it, and `canonicalize_service_type` is applied
//! deterministically to whatever the model returns, so a raw synonym can
//! never leak into a `SearchFilter`.

/// The canonical service-type names, as stored in the graph.
pub const CANONICAL_SERVICE_TYPES: &[&str] = &[
    "重度訪問介護",
    "生活介護",
    "同行援護",
    "短期入所",
    "居宅介護",
    "行動援護",
    "療養介護",
    "就労継続支援B型",
    "就労継続支援A型",
    "就労移行支援",
    "共同生活援助",
    "自立訓練",
];

/// Colloquial synonym → canonical name. Longer synonyms first where one
/// contains another (e.g. ショートステイ before ショート) so prompt
/// examples stay unambiguous.
pub const SERVICE_TYPE_SYNONYMS: &[(&str, &str)] = &[
    ("ショートステイ", "短期入所"),
    ("ショート", "短期入所"),
    ("グループホーム", "共同生活援助"),
    ("GH", "共同生活援助"),
    ("訪問ヘルパー", "居宅介護"),
    ("訪問介護", "居宅介護"),
    ("ヘルパー", "居宅介護"),
    ("デイサービス", "生活介護"),
    ("デイ", "生活介護"),
    ("通所", "生活介護"),
    ("就労継続B型", "就労継続支援B型"),
    ("就労B", "就労継続支援B型"),
    ("B型", "就労継続支援B型"),
    ("就労継続A型", "就労継続支援A型"),
    ("就労A", "就労継続支援A型"),
    ("A型", "就労継続支援A型"),
    ("移動支援", "同行援護"),
    ("ガイドヘルプ", "同行援護"),
    ("外出支援", "同行援護"),
    ("強度行動障害支援", "行動援護"),
    ("重度訪問", "重度訪問介護"),
    ("重訪", "重度訪問介護"),
];

/// Suffix every district name must carry.
const WARD_SUFFIX: char = '区';

/// Map a model-supplied service type to its canonical name.
///
/// Returns `None` for anything that is neither canonical nor a known
/// synonym — the caller drops the field rather than passing an unchecked
/// string into the store query.
pub fn canonicalize_service_type(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(&canonical) = CANONICAL_SERVICE_TYPES.iter().find(|&&c| c == trimmed) {
        return Some(canonical);
    }
    SERVICE_TYPE_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == trimmed)
        .map(|&(_, canonical)| canonical)
}

/// Normalize a district name to the 〜区 form (小倉南 → 小倉南区).
pub fn normalize_district(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.ends_with(WARD_SUFFIX) {
        Some(trimmed.to_string())
    } else {
        Some(format!("{trimmed}{WARD_SUFFIX}"))
    }
}

/// Render the synonym table as prompt lines (「別名」→「正式名称」).
pub fn synonym_prompt_block() -> String {
    SERVICE_TYPE_SYNONYMS
        .iter()
        .map(|(synonym, canonical)| format!("- 「{synonym}」→「{canonical}」"))
        .collect::<Vec<_>>()
        .join("\n")
}
