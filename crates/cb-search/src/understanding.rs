//! Query understanding — natural-language question → `SearchFilter`.

use cb_llm::{FieldSpec, KeyPolicy, LlmResult, StructuredExtractor};
use cb_protocol::SearchFilter;
use serde_json::Value;

use crate::synonyms;

/// Keys the model must return; lenient because a partially-filled filter
/// is still usable.
const FILTER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("facility_name"),
    FieldSpec::text("service_type"),
    FieldSpec::text("district"),
    FieldSpec::list("keywords"),
];

const ANALYZE_TEMPERATURE: f64 = 0.1;
const ANALYZE_MAX_TOKENS: u32 = 512;

/// Maps a facility question to a structured filter.
///
/// Never fails: any extraction problem degrades to an all-keywords
/// filter carrying the raw query, so the pipeline always has *a* filter.
pub struct QueryUnderstanding {
    extractor: StructuredExtractor,
    system_prompt: String,
}

impl QueryUnderstanding {
    pub fn new(extractor: StructuredExtractor) -> Self {
        Self {
            extractor,
            system_prompt: build_system_prompt(),
        }
    }

    pub async fn analyze(&self, query: &str) -> SearchFilter {
        match self.try_analyze(query).await {
            Ok(filter) => {
                tracing::debug!(?filter, "query analyzed");
                filter
            }
            Err(e) => {
                tracing::warn!(error = %e, query, "query analysis failed, falling back to keyword filter");
                SearchFilter::keyword_only(query)
            }
        }
    }

    async fn try_analyze(&self, query: &str) -> LlmResult<SearchFilter> {
        let object = self
            .extractor
            .extract(
                query,
                Some(&self.system_prompt),
                ANALYZE_TEMPERATURE,
                ANALYZE_MAX_TOKENS,
                FILTER_FIELDS,
                KeyPolicy::Lenient,
            )
            .await?;

        let service_type = nonempty_str(object.get("service_type")).and_then(|raw| {
            match synonyms::canonicalize_service_type(raw) {
                Some(canonical) => Some(canonical.to_string()),
                None => {
                    tracing::warn!(raw, "dropping unrecognized service type");
                    None
                }
            }
        });

        let district =
            nonempty_str(object.get("district")).and_then(synonyms::normalize_district);

        let keywords = object
            .get("keywords")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(SearchFilter {
            facility_name: nonempty_str(object.get("facility_name")).map(str::to_string),
            service_type,
            district,
            keywords,
        })
    }
}

/// A present, non-empty string value. Models frequently emit the literal
/// string "null" for absent fields; treat it as absent.
fn nonempty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
}

fn build_system_prompt() -> String {
    format!(
        r#"あなたは福祉サービス検索の専門家です。
ユーザーの質問から以下の情報を抽出してください:

【重要】事業所名が質問に含まれている場合は、必ず facility_name に抽出してください。
- facility_name: 事業所名（「〜ヘルパーセンター」「〜事業所」「〜支援センター」など）
- service_type: サービス種別の正式名称（後述の変換リストを参照）
- district: 地域（小倉北区、小倉南区、八幡西区など。必ず「〜区」を含める）
- keywords: サービス内容に関するキーワード（送迎、医療的ケアなど）
  ※「について」「詳細」「教えて」などの質問表現はkeywordsに含めない

【サービス種別の別名→正式名称 変換リスト】
一般的な呼び方を正式名称に変換してください:
{synonym_block}

【抽出ルール】
1. 事業所名の判定が最優先:
   - 固有名詞（みんなの〜、〜ヘルパーセンター、〜事業所、〜支援センターなど）
   - 「について」「の詳細」「を教えて」などが続く場合は事業所名の可能性大
   - 事業所名に「ショート」「デイ」などが含まれていても、それは名称の一部として facility_name に抽出
2. サービス種別は必ず正式名称に変換（上記リスト参照）
   - ただし、事業所名の一部として使われている場合は変換しない
3. 地域は必ず「〜区」の形式で抽出（「小倉南」→「小倉南区」）
4. keywords にはサービス内容に関する実質的なキーワードのみを含める
   - 含める: 送迎、医療的ケア、重度対応、土日営業など
   - 含めない: について、詳細、教えて、を、は、など助詞や質問表現

【重要な判定例】
- 「みんなのhome黒崎ショートについて」 → facility_name: "みんなのhome黒崎ショート", service_type: null
- 「八幡西区でショートステイを探す」 → facility_name: null, service_type: "短期入所"

以下のJSON形式で返答してください:
{{
  "facility_name": "事業所名 or null",
  "service_type": "正式なサービス種別名 or null",
  "district": "区名 or null",
  "keywords": ["キーワード1", "キーワード2"] or []
}}

JSON形式のみで返答し、説明文は含めないでください。"#,
        synonym_block = synonyms::synonym_prompt_block()
    )
}
