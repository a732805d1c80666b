//! Needs analysis over raw interview text.

use serde_json::{Map, Value};

use cb_llm::{FieldSpec, KeyPolicy, LlmError, LlmResult, StructuredExtractor};
use cb_protocol::{FollowupReport, FunctionalClassification, NeedsProfile, clamp_score};

const ANALYZE_TEMPERATURE: f64 = 0.7;
const ANALYZE_MAX_TOKENS: u32 = 4096;
const FOLLOWUP_TEMPERATURE: f64 = 0.3;
const FOLLOWUP_MAX_TOKENS: u32 = 2048;

/// The five list keys; every one must be present and a list.
const LIST_FIELDS: &[FieldSpec] = &[
    FieldSpec::list("analyzed_needs"),
    FieldSpec::list("strengths"),
    FieldSpec::list("challenges"),
    FieldSpec::list("preferences"),
    FieldSpec::list("family_wishes"),
];

const FOLLOWUP_FIELDS: &[FieldSpec] = &[
    FieldSpec::list("missing_areas"),
    FieldSpec::list("questions"),
    FieldSpec::number("completeness_score"),
    FieldSpec::boolean("is_sufficient"),
];

/// Analyzes interview text into a structured needs profile.
pub struct NeedsAnalyzer {
    extractor: StructuredExtractor,
}

impl NeedsAnalyzer {
    pub fn new(extractor: StructuredExtractor) -> Self {
        Self { extractor }
    }

    /// Analyze interview text into a `NeedsProfile`.
    ///
    /// Strict on the five list keys (a missing key or a non-list value is
    /// a `Validation` error), lenient on the classification axes (a
    /// missing axis becomes an empty string with a warning). `confidence`
    /// is computed by the deterministic rubric, never taken from the model.
    pub async fn analyze(&self, interview_text: &str) -> LlmResult<NeedsProfile> {
        tracing::info!("starting needs analysis");

        let prompt = NEEDS_ANALYSIS_PROMPT.replace("{interview_content}", interview_text);
        let object = self
            .extractor
            .extract(
                &prompt,
                None,
                ANALYZE_TEMPERATURE,
                ANALYZE_MAX_TOKENS,
                LIST_FIELDS,
                KeyPolicy::Strict,
            )
            .await?;

        let mut profile = NeedsProfile {
            analyzed_needs: string_list(&object, "analyzed_needs")?,
            strengths: string_list(&object, "strengths")?,
            challenges: string_list(&object, "challenges")?,
            preferences: string_list(&object, "preferences")?,
            family_wishes: string_list(&object, "family_wishes")?,
            functional_classification: classification(&object),
            confidence: 0.0,
        };

        if profile.analyzed_needs.is_empty() {
            tracing::warn!("analysis identified no needs");
        }
        if profile.strengths.is_empty() {
            tracing::warn!("analysis identified no strengths");
        }
        if profile.challenges.is_empty() {
            tracing::warn!("analysis identified no challenges");
        }

        profile.confidence = confidence(&profile);
        tracing::info!(confidence = profile.confidence, "needs analysis complete");
        Ok(profile)
    }

    /// Check interview coverage against the seven required topics and
    /// generate targeted follow-up questions for the gaps.
    pub async fn followup_questions(&self, interview_text: &str) -> LlmResult<FollowupReport> {
        tracing::info!("generating follow-up questions");

        let prompt = FOLLOWUP_QUESTIONS_PROMPT.replace("{interview_content}", interview_text);
        let object = self
            .extractor
            .extract(
                &prompt,
                None,
                FOLLOWUP_TEMPERATURE,
                FOLLOWUP_MAX_TOKENS,
                FOLLOWUP_FIELDS,
                KeyPolicy::Lenient,
            )
            .await?;

        let mut report: FollowupReport = serde_json::from_value(Value::Object(object))
            .map_err(|e| LlmError::Validation(format!("follow-up report shape: {e}")))?;
        report.completeness_score = clamp_score(report.completeness_score);

        tracing::info!(
            questions = report.questions.len(),
            sufficient = report.is_sufficient,
            "follow-up questions generated"
        );
        Ok(report)
    }
}

/// Analysis-quality confidence rubric. Pure over the profile:
/// 40% completeness thresholds, 30% classification axes with substantive
/// text, 20% strengths/needs balance, 10% needs specificity.
pub fn confidence(profile: &NeedsProfile) -> f64 {
    let mut score: f64 = 0.0;

    if profile.analyzed_needs.len() >= 3 {
        score += 0.08;
    }
    if profile.strengths.len() >= 2 {
        score += 0.08;
    }
    if profile.challenges.len() >= 2 {
        score += 0.08;
    }
    if !profile.preferences.is_empty() {
        score += 0.08;
    }
    if !profile.family_wishes.is_empty() {
        score += 0.08;
    }

    for axis in profile.functional_classification.axes() {
        if axis.chars().count() > 10 {
            score += 0.06;
        }
    }

    let needs_count = profile.analyzed_needs.len();
    let strengths_count = profile.strengths.len();
    if needs_count > 0 && strengths_count > 0 {
        let ratio = strengths_count as f64 / (strengths_count + needs_count) as f64;
        if (0.2..=0.6).contains(&ratio) {
            score += 0.2;
        }
    }

    if !profile.analyzed_needs.is_empty() {
        let total_chars: usize = profile
            .analyzed_needs
            .iter()
            .map(|item| item.chars().count())
            .sum();
        let avg = total_chars as f64 / profile.analyzed_needs.len() as f64;
        if avg > 15.0 {
            score += 0.1;
        }
    }

    (score * 100.0).round() / 100.0
}

/// A required list-of-strings key. A non-list value is a `Validation`
/// error; non-string items are dropped with a warning.
fn string_list(object: &Map<String, Value>, key: &str) -> LlmResult<Vec<String>> {
    let items = object
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Validation(format!("{key} must be a list")))?;

    Ok(items
        .iter()
        .filter_map(|item| match item.as_str() {
            Some(text) => Some(text.trim().to_string()),
            None => {
                tracing::warn!(key, "dropping non-string list item");
                None
            }
        })
        .filter(|text| !text.is_empty())
        .collect())
}

fn classification(object: &Map<String, Value>) -> FunctionalClassification {
    match object.get("icf_classification") {
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!(error = %e, "malformed icf_classification, using empty axes");
                FunctionalClassification::default()
            }
        },
        None => {
            tracing::warn!("missing icf_classification, using empty axes");
            FunctionalClassification::default()
        }
    }
}

const NEEDS_ANALYSIS_PROMPT: &str = r#"あなたは経験豊富な計画相談支援専門員です。
以下のヒアリング内容から、利用者の潜在的なニーズを分析してください。

【ヒアリング内容】
{interview_content}

【分析の観点】
1. ICFモデルに基づく分類
   - 心身機能（body functions）: 身体的・精神的機能の状態
   - 活動（activities）: 日常生活動作や活動の実施状況
   - 参加（participation）: 社会参加や役割遂行の状況
   - 環境因子（environmental factors）: 物理的・社会的・制度的環境
   - 個人因子（personal factors）: 年齢、性別、価値観、ライフスタイル

2. 構造化
   - 本人の希望: 本人が明示的に述べた希望
   - 家族の希望: 家族が期待していること
   - 本人の強み: 活用できる能力や資源
   - 支援が必要な課題: 解決すべき困難や障壁
   - 潜在的なニーズ: 明示されていないが重要なニーズ

**重要**: 必ず以下の正確なJSON形式で返答してください。他の説明やテキストは一切含めず、JSON構造のみを返してください。

```json
{
  "analyzed_needs": ["一人暮らしを実現するための生活スキル習得支援", "経済的自立に向けた就労支援", "金銭管理スキルの習得"],
  "strengths": ["明確な目標を持っている", "就労への意欲がある", "貯金を通じた計画性"],
  "challenges": ["生活スキルの習得", "安定した就労の実現", "金銭管理能力の向上"],
  "preferences": ["一人暮らしをしたい", "就職して貯金を貯めたい"],
  "family_wishes": [],
  "icf_classification": {
    "body_functions": "ヒアリング内容から判断される心身機能の状態",
    "activities": "就労や生活管理などの日常活動の実施状況",
    "participation": "社会参加や就労への参加意欲",
    "environmental_factors": "住環境や就労環境などの環境要因",
    "personal_factors": "目標志向性や計画性などの個人特性"
  }
}
```"#;

const FOLLOWUP_QUESTIONS_PROMPT: &str = r#"あなたは経験豊富な計画相談支援専門員です。
以下のヒアリング内容を確認し、不足している情報を特定して追加質問を生成してください。

【ヒアリング内容】
{interview_content}

【確認すべき重要項目】
1. 本人の希望や目標（どんな生活がしたいか）
2. 本人の強み・得意なこと・好きなこと
3. 家族の希望や心配事
4. 日常生活での困りごと
5. 社会参加や人との関わり
6. 現在利用しているサービス
7. 健康状態や医療的ケア

【質問生成のルール】
- 不足している項目について、3-5個の具体的な質問を生成
- 質問は優しく、答えやすい形式にする
- はい/いいえで答えられるものと、具体的に聞くものを組み合わせる
- 既に十分な情報がある項目は質問しない

JSON形式で返答してください。JSONのみを返し、他の説明は含めないでください。

{
  "missing_areas": ["不足している情報の分野1", "不足している情報の分野2"],
  "questions": [
    {
      "category": "本人の強み",
      "question": "ご本人が得意なことや好きなことはありますか？",
      "purpose": "本人の強みを活用した支援計画を立てるため"
    }
  ],
  "completeness_score": 0.6,
  "is_sufficient": false
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use cb_llm::{OllamaClient, OllamaConfig};

    fn analyzer_for(server: &MockServer) -> NeedsAnalyzer {
        let client = Arc::new(OllamaClient::new(OllamaConfig {
            base_url: server.uri(),
            timeout_secs: 2,
            ..OllamaConfig::default()
        }));
        NeedsAnalyzer::new(StructuredExtractor::new(client))
    }

    async fn mount_response(server: &MockServer, content: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": content})),
            )
            .mount(server)
            .await;
    }

    fn full_profile() -> NeedsProfile {
        NeedsProfile {
            analyzed_needs: vec![
                "一人暮らしを実現するための生活スキル習得支援".into(),
                "経済的自立に向けた就労支援".into(),
                "金銭管理スキルの習得に関する支援".into(),
            ],
            strengths: vec!["明確な目標を持っている".into(), "就労への意欲がある".into()],
            challenges: vec!["生活スキルの習得".into(), "安定した就労の実現".into()],
            preferences: vec!["一人暮らしをしたい".into()],
            family_wishes: vec!["無理のない範囲で自立してほしい".into()],
            functional_classification: FunctionalClassification {
                body_functions: "精神面は安定しており体調も良好である".into(),
                activities: "日常生活動作はおおむね自立している".into(),
                participation: "就労への参加意欲が高く通所を続けている".into(),
                environmental_factors: "家族の理解があり住環境も安定している".into(),
                personal_factors: "目標志向性が高く計画的に行動できる".into(),
            },
            confidence: 0.0,
        }
    }

    // ── confidence rubric ────────────────────────────────────────

    #[test]
    fn full_profile_scores_one() {
        assert_eq!(confidence(&full_profile()), 1.0);
    }

    #[test]
    fn empty_profile_scores_zero() {
        assert_eq!(confidence(&NeedsProfile::default()), 0.0);
    }

    #[test]
    fn confidence_is_pure() {
        let profile = full_profile();
        assert_eq!(confidence(&profile), confidence(&profile));
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let mut profile = full_profile();
        for _ in 0..20 {
            profile.analyzed_needs.push("追加のニーズ項目でかなり長い記述".into());
        }
        let score = confidence(&profile);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn short_axes_do_not_count() {
        let mut profile = full_profile();
        profile.functional_classification.body_functions = "良好".into();
        assert_eq!(confidence(&profile), 0.94);
    }

    #[test]
    fn unbalanced_strengths_lose_the_balance_weight() {
        let mut profile = full_profile();
        // 8 strengths vs 3 needs puts the ratio above 0.6.
        profile.strengths = (0..8).map(|i| format!("強み{i}")).collect();
        assert_eq!(confidence(&profile), 0.8);
    }

    #[test]
    fn generic_short_needs_lose_the_specificity_weight() {
        let mut profile = full_profile();
        profile.analyzed_needs = vec!["就労支援".into(), "生活支援".into(), "金銭管理".into()];
        assert_eq!(confidence(&profile), 0.9);
    }

    // ── analyze ──────────────────────────────────────────────────

    #[tokio::test]
    async fn analyze_builds_profile_with_computed_confidence() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            r#"{
                "analyzed_needs": ["一人暮らしを実現するための生活スキル習得支援", "経済的自立に向けた就労支援", "金銭管理スキルの習得に関する支援"],
                "strengths": ["明確な目標を持っている", "就労への意欲がある"],
                "challenges": ["生活スキルの習得", "安定した就労の実現"],
                "preferences": ["一人暮らしをしたい"],
                "family_wishes": [],
                "icf_classification": {
                    "body_functions": "精神面は安定しており体調も良好である",
                    "activities": "日常生活動作はおおむね自立している",
                    "participation": "就労への参加意欲が高く通所を続けている",
                    "environmental_factors": "家族の理解があり住環境も安定している",
                    "personal_factors": "目標志向性が高く計画的に行動できる"
                }
            }"#,
        )
        .await;

        let profile = analyzer_for(&server).analyze("面談記録").await.unwrap();
        assert_eq!(profile.analyzed_needs.len(), 3);
        assert!(profile.family_wishes.is_empty());
        // Everything except the family-wishes threshold holds.
        assert_eq!(profile.confidence, 0.92);
    }

    #[tokio::test]
    async fn non_list_needs_is_validation_error() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            r#"{
                "analyzed_needs": "就労支援",
                "strengths": [], "challenges": [], "preferences": [], "family_wishes": [],
                "icf_classification": {}
            }"#,
        )
        .await;

        let err = analyzer_for(&server).analyze("面談記録").await.unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_list_key_is_validation_error() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            r#"{"analyzed_needs": [], "strengths": [], "challenges": [], "preferences": []}"#,
        )
        .await;

        let err = analyzer_for(&server).analyze("面談記録").await.unwrap_err();
        assert!(err.to_string().contains("family_wishes"));
    }

    #[tokio::test]
    async fn empty_lists_yield_penalized_profile_not_error() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            r#"{
                "analyzed_needs": [], "strengths": [], "challenges": [],
                "preferences": [], "family_wishes": [],
                "icf_classification": {}
            }"#,
        )
        .await;

        let profile = analyzer_for(&server).analyze("特に情報なし").await.unwrap();
        assert!(profile.analyzed_needs.is_empty());
        assert!(profile.strengths.is_empty());
        assert!(profile.challenges.is_empty());
        assert_eq!(profile.confidence, 0.0);
    }

    #[tokio::test]
    async fn missing_classification_defaults_to_empty_axes() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            r#"{
                "analyzed_needs": ["就労支援が必要である"], "strengths": ["意欲がある"],
                "challenges": ["生活リズム"], "preferences": [], "family_wishes": []
            }"#,
        )
        .await;

        let profile = analyzer_for(&server).analyze("面談記録").await.unwrap();
        assert_eq!(profile.functional_classification, FunctionalClassification::default());
    }

    // ── followup_questions ───────────────────────────────────────

    #[tokio::test]
    async fn followup_report_is_parsed_and_clamped() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            r#"{
                "missing_areas": ["家族の希望", "健康状態や医療的ケア"],
                "questions": [
                    {"category": "家族の希望", "question": "ご家族はどのような生活を望んでいますか？", "purpose": "家族のニーズも考慮した計画を立てるため"}
                ],
                "completeness_score": 1.4,
                "is_sufficient": false
            }"#,
        )
        .await;

        let report = analyzer_for(&server)
            .followup_questions("面談記録")
            .await
            .unwrap();
        assert_eq!(report.missing_areas.len(), 2);
        assert_eq!(report.questions[0].category, "家族の希望");
        assert_eq!(report.completeness_score, 1.0);
        assert!(!report.is_sufficient);
    }

    #[tokio::test]
    async fn followup_missing_keys_are_backfilled() {
        let server = MockServer::start().await;
        mount_response(&server, r#"{"missing_areas": []}"#).await;

        let report = analyzer_for(&server)
            .followup_questions("十分な面談記録")
            .await
            .unwrap();
        assert!(report.questions.is_empty());
        assert_eq!(report.completeness_score, 0.0);
        assert!(!report.is_sufficient);
    }
}
