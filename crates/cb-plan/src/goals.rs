//! Goal suggestion and SMART evaluation.

use serde_json::Value;

use cb_llm::{FieldSpec, KeyPolicy, LlmError, LlmResult, StructuredExtractor};
use cb_protocol::{GoalCandidate, NeedsProfile, SmartAssessment, SmartEvaluation, clamp_score};

const SUGGEST_TEMPERATURE: f64 = 0.7;
const SUGGEST_MAX_TOKENS: u32 = 4096;
const EVALUATE_TEMPERATURE: f64 = 0.5;
const EVALUATE_MAX_TOKENS: u32 = 2048;

const SUGGEST_FIELDS: &[FieldSpec] = &[FieldSpec::list("goals")];

/// The five booleans are backfilled as false when missing; `smart_score`
/// is deliberately not required so its absence stays observable.
const EVALUATE_FIELDS: &[FieldSpec] = &[
    FieldSpec::boolean("is_specific"),
    FieldSpec::boolean("is_measurable"),
    FieldSpec::boolean("is_achievable"),
    FieldSpec::boolean("is_relevant"),
    FieldSpec::boolean("is_time_bound"),
    FieldSpec::list("suggestions"),
];

/// Which planning horizon a goal suggestion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalType {
    LongTerm,
    ShortTerm,
}

impl GoalType {
    /// Label used in prompts and persisted records.
    pub fn label(self) -> &'static str {
        match self {
            GoalType::LongTerm => "長期目標",
            GoalType::ShortTerm => "短期目標",
        }
    }
}

/// Suggests SMART goals from a needs profile and scores arbitrary goal
/// text against the SMART criteria.
pub struct GoalGenerator {
    extractor: StructuredExtractor,
}

impl GoalGenerator {
    pub fn new(extractor: StructuredExtractor) -> Self {
        Self { extractor }
    }

    /// Suggest 3-5 goal candidates for the given horizon.
    pub async fn suggest_goals(
        &self,
        profile: &NeedsProfile,
        goal_type: GoalType,
    ) -> LlmResult<Vec<GoalCandidate>> {
        tracing::info!(goal_type = goal_type.label(), "generating goal suggestions");

        let prompt = build_suggest_prompt(profile, goal_type);
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
            .get("goals")
            .and_then(Value::as_array)
            .ok_or_else(|| LlmError::Validation("goals must be a list".into()))?;

        let mut goals = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<GoalCandidate>(entry.clone()) {
                Ok(mut goal) => {
                    goal.confidence = clamp_score(goal.confidence);
                    goals.push(goal);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed goal candidate");
                }
            }
        }

        if goals.is_empty() {
            return Err(LlmError::Validation(
                "goal generation produced no usable candidates".into(),
            ));
        }

        tracing::info!(count = goals.len(), "goal suggestions generated");
        Ok(goals)
    }

    /// Score a goal text against the five SMART criteria.
    ///
    /// `smart_score` comes from the model when supplied; otherwise it is
    /// the fraction of the five booleans that hold. The model is not
    /// trusted to always include the aggregate.
    pub async fn evaluate_smart(&self, goal_text: &str) -> LlmResult<SmartEvaluation> {
        tracing::info!("evaluating goal against SMART criteria");

        let prompt = SMART_EVALUATION_PROMPT.replace("{goal_text}", goal_text);
        let object = self
            .extractor
            .extract(
                &prompt,
                None,
                EVALUATE_TEMPERATURE,
                EVALUATE_MAX_TOKENS,
                EVALUATE_FIELDS,
                KeyPolicy::Lenient,
            )
            .await?;

        let model_score = object.get("smart_score").and_then(Value::as_f64);
        let assessment: SmartAssessment =
            serde_json::from_value(Value::Object(object.clone()))
                .map_err(|e| LlmError::Validation(format!("SMART assessment shape: {e}")))?;

        let smart_score = match model_score {
            Some(score) => clamp_score(score),
            None => clamp_score(assessment.true_fraction()),
        };

        let suggestions = object
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        tracing::info!(smart_score, "SMART evaluation complete");
        Ok(SmartEvaluation {
            assessment,
            smart_score,
            suggestions,
        })
    }
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join("、")
    }
}

fn axis_or(axis: &str) -> &str {
    if axis.is_empty() { "未評価" } else { axis }
}

fn build_suggest_prompt(profile: &NeedsProfile, goal_type: GoalType) -> String {
    let icf = &profile.functional_classification;
    format!(
        r#"あなたは計画相談支援専門員です。
以下のアセスメント結果から、SMART原則に基づいた{goal_type}を提案してください。

【重要】このシステムは主に知的障害・精神障害のある方を対象としています。
目標設定時は、認知特性、コミュニケーション方法、環境調整、精神的安定を考慮してください。

【アセスメント結果】
利用者の希望: {preferences}
家族の希望: {family_wishes}
分析されたニーズ: {analyzed_needs}
強み: {strengths}
課題: {challenges}

【ICF分類による評価】
心身機能: {body_functions}
活動: {activities}
参加: {participation}
環境因子: {environmental_factors}
個人因子: {personal_factors}

【目標設定の指針】
- 本人と家族の希望を最優先に考える
- 本人の強みを活かせる目標にする
- 課題に対応しつつ、実現可能性を重視する
- ICF評価を踏まえた包括的な目標にする

【SMART原則】
- Specific (具体的): 何を、どのように達成するか明確
- Measurable (測定可能): 達成度を測定できる基準がある
- Achievable (達成可能): 利用者の能力と環境で実現可能
- Relevant (関連性): ニーズや希望と関連している
- Time-bound (期限付き): いつまでに達成するか明確

JSON形式で3-5個の目標案を提案してください。JSONのみを返し、他の説明は含めないでください。

{{
  "goals": [
    {{
      "goal_text": "目標の内容（具体的に記述）",
      "goal_reason": "この目標を設定する理由",
      "evaluation_period": "評価期間（例: 6ヶ月、1年）",
      "evaluation_method": "評価方法（どう測定するか）",
      "smart_evaluation": {{
        "is_specific": true,
        "is_measurable": true,
        "is_achievable": true,
        "is_relevant": true,
        "is_time_bound": true
      }},
      "confidence": 0.85
    }}
  ]
}}"#,
        goal_type = goal_type.label(),
        preferences = join_or(&profile.preferences, "未記載"),
        family_wishes = join_or(&profile.family_wishes, "未記載"),
        analyzed_needs = join_or(&profile.analyzed_needs, "分析中"),
        strengths = join_or(&profile.strengths, "評価中"),
        challenges = join_or(&profile.challenges, "評価中"),
        body_functions = axis_or(&icf.body_functions),
        activities = axis_or(&icf.activities),
        participation = axis_or(&icf.participation),
        environmental_factors = axis_or(&icf.environmental_factors),
        personal_factors = axis_or(&icf.personal_factors),
    )
}

const SMART_EVALUATION_PROMPT: &str = r#"以下の目標をSMART原則で評価してください。

目標: {goal_text}

SMART原則:
- Specific (具体的): 何を、どのように達成するか明確か
- Measurable (測定可能): 達成度を測定できる基準があるか
- Achievable (達成可能): 現実的に実現可能か
- Relevant (関連性): 本人のニーズと関連しているか
- Time-bound (期限付き): いつまでに達成するか明確か

JSON形式で評価結果を返してください。JSONのみを返してください。

{
  "is_specific": true/false,
  "is_measurable": true/false,
  "is_achievable": true/false,
  "is_relevant": true/false,
  "is_time_bound": true/false,
  "smart_score": 0.0-1.0,
  "suggestions": ["改善提案1", "改善提案2"]
}
"#;
