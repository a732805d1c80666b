//! Answer composition — grounded natural-language answers over retrieved
//! facilities, with a deterministic listing when generation fails.

use std::sync::Arc;

use cb_llm::OllamaClient;
use cb_protocol::FacilityCandidate;

/// Fixed reply when retrieval produced no candidates. The model is not
/// consulted, so nothing can be hallucinated into an empty result.
pub const NO_RESULTS_MESSAGE: &str =
    "申し訳ございません。該当する事業所が見つかりませんでした。検索条件を変えて再度お試しください。";

const COMPOSE_TEMPERATURE: f64 = 0.3;
const COMPOSE_MAX_TOKENS: u32 = 1024;

const COMPOSE_SYSTEM_PROMPT: &str = r#"あなたは北九州市の障害福祉サービス相談支援専門員です。
検索結果の事業所情報をもとに、利用者の質問に日本語で丁寧に答えてください。

【回答ルール】
1. 提供された事業所情報のみを使って回答する（情報にない内容を推測・創作しない）
2. 事業所の電話番号は必ず回答に含める
3. 定員や空き状況が提供されている場合はそれも伝える
4. 複数の事業所がある場合は比較しやすいよう整理して提示する
5. 最後に「詳細は各事業所へ直接お問い合わせください」と案内する"#;

/// Composes the user-facing answer from the query and the candidates.
pub struct AnswerComposer {
    client: Arc<OllamaClient>,
}

impl AnswerComposer {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }

    pub async fn compose(&self, query: &str, candidates: &[FacilityCandidate]) -> String {
        if candidates.is_empty() {
            return NO_RESULTS_MESSAGE.to_string();
        }

        let prompt = format!(
            "【利用者の質問】\n{query}\n\n【検索結果】\n{context}\n\n上記の検索結果に基づいて質問に回答してください。",
            context = render_context(candidates)
        );

        match self
            .client
            .generate(
                &prompt,
                Some(COMPOSE_SYSTEM_PROMPT),
                Some(COMPOSE_TEMPERATURE),
                Some(COMPOSE_MAX_TOKENS),
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "answer generation failed, returning plain listing");
                format_basic_list(candidates)
            }
        }
    }
}

/// Render candidates as numbered 【事業所 n】blocks for the prompt.
fn render_context(candidates: &[FacilityCandidate]) -> String {
    let mut context = String::new();
    for (i, facility) in candidates.iter().enumerate() {
        context.push_str(&format!("【事業所 {}】\n", i + 1));
        context.push_str(&format!("名称: {}\n", facility.name));
        if let Some(corporation) = &facility.corporation_name {
            context.push_str(&format!("法人: {corporation}\n"));
        }
        if let Some(service_type) = &facility.service_type {
            context.push_str(&format!("サービス種別: {service_type}\n"));
        }
        if let Some(address) = &facility.address {
            context.push_str(&format!("所在地: {address}\n"));
        }
        if let Some(phone) = &facility.phone {
            context.push_str(&format!("電話: {phone}\n"));
        }
        if let Some(capacity) = facility.capacity {
            context.push_str(&format!("定員: {capacity}名\n"));
        }
        if let Some(availability) = &facility.availability_status {
            context.push_str(&format!("空き状況: {availability}\n"));
        }
        context.push('\n');
    }
    context
}

/// Plain numbered listing used when the model is unavailable. Contains
/// only store data, so it is always safe to show.
fn format_basic_list(candidates: &[FacilityCandidate]) -> String {
    let mut lines = vec![format!(
        "該当する事業所が{}件見つかりました:",
        candidates.len()
    )];
    for (i, facility) in candidates.iter().enumerate() {
        let service_type = facility.service_type.as_deref().unwrap_or("サービス種別不明");
        lines.push(format!("{}. {} ({})", i + 1, facility.name, service_type));
        if let Some(address) = &facility.address {
            lines.push(format!("   所在地: {address}"));
        }
        if let Some(phone) = &facility.phone {
            lines.push(format!("   電話: {phone}"));
        }
    }
    lines.join("\n")
}
