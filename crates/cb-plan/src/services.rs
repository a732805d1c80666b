//! Service suggestion and facility ranking.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use cb_graph::{FacilityStore, StoreResult};
use cb_llm::{FieldSpec, KeyPolicy, LlmError, LlmResult, StructuredExtractor};
use cb_protocol::{
    FacilityCandidate, FacilityMatch, GoalCandidate, NeedsProfile, SearchFilter,
    ServiceNeedSuggestion, ServicePriority, UserProfile, clamp_score,
};

const SUGGEST_TEMPERATURE: f64 = 0.3;
const SUGGEST_MAX_TOKENS: u32 = 2048;
const SCORE_TEMPERATURE: f64 = 0.2;
const SCORE_MAX_TOKENS: u32 = 1024;

/// Score given to a candidate whose scoring call failed.
const NEUTRAL_MATCH_SCORE: f64 = 0.5;
/// Reason attached to a neutrally-scored candidate.
pub const NEUTRAL_MATCH_REASON: &str = "自動評価失敗";

/// Service types offered when the store cannot supply the live list.
pub const FALLBACK_SERVICE_TYPES: &[&str] = &[
    "就労継続支援B型",
    "就労継続支援A型",
    "生活介護",
    "就労移行支援",
    "自立訓練",
    "グループホーム",
];

const SUGGEST_FIELDS: &[FieldSpec] = &[FieldSpec::list("service_needs")];

const SCORE_FIELDS: &[FieldSpec] = &[
    FieldSpec::number("match_score"),
    FieldSpec::list("reasons"),
    FieldSpec::list("concerns"),
];

/// Suggests services for a plan and ranks facilities for a service type.
pub struct ServiceCoordinator {
    extractor: StructuredExtractor,
    store: Arc<dyn FacilityStore>,
}

impl ServiceCoordinator {
    pub fn new(extractor: StructuredExtractor, store: Arc<dyn FacilityStore>) -> Self {
        Self { extractor, store }
    }

    /// Suggest services matching the user's needs and goals.
    ///
    /// The prompt offers the live service-type list from the store; when
    /// the store is unavailable a fixed list stands in so suggestion
    /// still works during a store outage.
    pub async fn suggest_services(
        &self,
        user: &UserProfile,
        profile: &NeedsProfile,
        goals: &[GoalCandidate],
    ) -> LlmResult<Vec<ServiceNeedSuggestion>> {
        tracing::info!("suggesting services");

        let available_types = self.available_service_types().await;
        let prompt = build_suggest_prompt(user, profile, goals, &available_types);
        let object = self
            .extractor
            .extract(
                &prompt,
                None,
                SUGGEST_TEMPERATURE,
                SUGGEST_MAX_TOKENS,
                SUGGEST_FIELDS,
                KeyPolicy::Strict,
            )
            .await?;

        let entries = object
            .get("service_needs")
            .and_then(Value::as_array)
            .ok_or_else(|| LlmError::Validation("service_needs must be a list".into()))?;

        let mut suggestions = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut entry = entry.clone();
            normalize_priority(&mut entry);
            match serde_json::from_value::<ServiceNeedSuggestion>(entry) {
                Ok(suggestion) => suggestions.push(suggestion),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed service suggestion");
                }
            }
        }

        if suggestions.is_empty() {
            return Err(LlmError::Validation(
                "service suggestion produced no usable entries".into(),
            ));
        }

        tracing::info!(count = suggestions.len(), "services suggested");
        Ok(suggestions)
    }

    /// Retrieve and rank facilities offering `service_type`.
    ///
    /// Fetches up to `limit * 2` candidates (preferring the user's
    /// district), scores the first `limit` sequentially, and orders by
    /// score descending. A candidate whose scoring call fails is kept
    /// with the neutral score; ties keep retrieval order.
    pub async fn rank_facilities(
        &self,
        service_type: &str,
        user: &UserProfile,
        profile: &NeedsProfile,
        limit: u32,
    ) -> StoreResult<Vec<FacilityMatch>> {
        tracing::info!(service_type, limit, "ranking facilities");

        let filter = SearchFilter {
            service_type: Some(service_type.to_string()),
            district: user.district.clone(),
            ..SearchFilter::default()
        };
        let candidates = self.store.search(&filter, limit * 2).await?;

        if candidates.is_empty() {
            tracing::warn!(service_type, "no facilities found for service type");
            return Ok(Vec::new());
        }

        let mut matches = Vec::with_capacity(candidates.len().min(limit as usize));
        for facility in candidates.into_iter().take(limit as usize) {
            let scored = match self.score_facility(&facility, user, profile).await {
                Ok((score, reasons, concerns)) => FacilityMatch {
                    facility,
                    match_score: clamp_score(score),
                    match_reasons: reasons,
                    match_concerns: concerns,
                },
                Err(e) => {
                    tracing::warn!(name = %facility.name, error = %e, "facility scoring failed");
                    FacilityMatch {
                        facility,
                        match_score: NEUTRAL_MATCH_SCORE,
                        match_reasons: vec![NEUTRAL_MATCH_REASON.to_string()],
                        match_concerns: Vec::new(),
                    }
                }
            };
            matches.push(scored);
        }

        // Stable: ties keep retrieval order.
        matches.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(Ordering::Equal)
        });

        tracing::info!(count = matches.len(), "facilities ranked");
        Ok(matches)
    }

    async fn available_service_types(&self) -> Vec<String> {
        match self.store.service_types().await {
            Ok(types) if !types.is_empty() => types,
            Ok(_) => {
                tracing::warn!("store has no service types, using fixed list");
                FALLBACK_SERVICE_TYPES.iter().map(|t| t.to_string()).collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "service-type lookup failed, using fixed list");
                FALLBACK_SERVICE_TYPES.iter().map(|t| t.to_string()).collect()
            }
        }
    }

    async fn score_facility(
        &self,
        facility: &FacilityCandidate,
        user: &UserProfile,
        profile: &NeedsProfile,
    ) -> LlmResult<(f64, Vec<String>, Vec<String>)> {
        let prompt = build_score_prompt(facility, user, profile);
        let object = self
            .extractor
            .extract(
                &prompt,
                None,
                SCORE_TEMPERATURE,
                SCORE_MAX_TOKENS,
                SCORE_FIELDS,
                KeyPolicy::Strict,
            )
            .await?;

        let score = object
            .get("match_score")
            .and_then(Value::as_f64)
            .ok_or_else(|| LlmError::Validation("match_score must be a number".into()))?;

        Ok((score, string_items(&object, "reasons"), string_items(&object, "concerns")))
    }
}

fn string_items(object: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Rewrite a suggestion's `priority` to a canonical label so the typed
/// deserialization accepts the English spellings some models emit.
/// Unknown labels are removed, letting the default apply.
fn normalize_priority(entry: &mut Value) {
    let Some(object) = entry.as_object_mut() else {
        return;
    };
    let Some(label) = object.get("priority").and_then(Value::as_str) else {
        object.remove("priority");
        return;
    };
    match ServicePriority::parse(label) {
        Some(priority) => {
            if let Ok(canonical) = serde_json::to_value(priority) {
                object.insert("priority".into(), canonical);
            }
        }
        None => {
            tracing::warn!(label, "dropping unrecognized priority label");
            object.remove("priority");
        }
    }
}

fn build_suggest_prompt(
    user: &UserProfile,
    profile: &NeedsProfile,
    goals: &[GoalCandidate],
    available_types: &[String],
) -> String {
    let goals_text = if goals.is_empty() {
        "- 未設定".to_string()
    } else {
        goals
            .iter()
            .map(|goal| format!("- {}", goal.goal_text))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let age = user
        .age
        .map(|age| age.to_string())
        .unwrap_or_else(|| "不明".to_string());

    format!(
        r#"あなたは計画相談支援専門員です。
以下の利用者情報と目標から、最適なサービスを提案してください。

【重要】このシステムは主に知的障害・精神障害のある方を対象としています。
身体障害のみの方は例外的なケースです。

【利用者情報】
年齢: {age}歳
障害種別: {disability_type}
障害支援区分: {support_level}
生活状況: {living_situation}

【アセスメント結果】
本人の希望: {preferences}
分析されたニーズ: {analyzed_needs}
強み: {strengths}
課題: {challenges}

【目標】
{goals_text}

【提案するサービス種別の候補】
{available_service_types}

以下の観点でサービスを提案してください:
1. 目標達成に必要なサービス種別
2. 週当たりの利用頻度（週1回、週3回など）
3. 優先順位（必須、推奨、オプション）
4. サービスを選んだ理由

JSON形式で返答してください。JSONのみを返し、他の説明は含めないでください。

{{
  "service_needs": [
    {{
      "service_type": "サービス種別",
      "frequency": "週3回",
      "priority": "必須",
      "reason": "このサービスが必要な理由",
      "duration_hours": 4.0,
      "preferred_time": "午前",
      "special_requirements": "特別な要件があれば"
    }}
  ]
}}"#,
        disability_type = user.disability_type,
        support_level = user.support_level,
        living_situation = user.living_situation,
        preferences = profile.preferences.join("、"),
        analyzed_needs = profile.analyzed_needs.join("、"),
        strengths = profile.strengths.join("、"),
        challenges = profile.challenges.join("、"),
        available_service_types = available_types.join("、"),
    )
}

fn build_score_prompt(
    facility: &FacilityCandidate,
    user: &UserProfile,
    profile: &NeedsProfile,
) -> String {
    let capacity = facility
        .capacity
        .map(|c| c.to_string())
        .unwrap_or_else(|| "不明".to_string());

    format!(
        r#"以下の条件に最適な事業所を評価してください。

【重要】このシステムは主に知的障害・精神障害のある方を対象としています。
評価時は、認知面・精神面への支援体制、コミュニケーション方法、環境調整を重視してください。

【利用者の条件】
- 障害種別: {disability_type}
- 支援区分: {support_level}
- 希望: {preferences}
- 居住地: {district}

【事業所情報】
事業所名: {name}
法人名: {corporation}
所在地: {address}
所在区: {facility_district}
定員: {capacity}
空き状況: {availability}

【評価基準】
1. 対応可能性（障害種別、支援区分、支援体制）
2. 希望との適合性
3. 通所の利便性（同じ区内か）
4. 空き状況

スコア（0.0-1.0）と推薦理由を返してください。

{{
  "match_score": 0.85,
  "reasons": ["理由1", "理由2", "理由3"],
  "concerns": ["懸念点1"]
}}"#,
        disability_type = user.disability_type,
        support_level = user.support_level,
        preferences = profile.preferences.join("、"),
        district = user.district.as_deref().unwrap_or("不明"),
        name = facility.name,
        corporation = facility.corporation_name.as_deref().unwrap_or("不明"),
        address = facility.address.as_deref().unwrap_or("不明"),
        facility_district = facility.district.as_deref().unwrap_or("不明"),
        availability = facility.availability_status.as_deref().unwrap_or("不明"),
    )
}
