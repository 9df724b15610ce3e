//! 题目生成服务 - 业务能力层
//!
//! 只负责"把一个媒体引用变成一套考题"这一能力，不关心流程。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::exam::{PartKind, Provenance, Question};
use crate::models::source::MediaReference;
use crate::services::source_resolver::SourceResolver;

/// 生成网关的单 Part 输出
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub questions: Vec<Question>,
    pub transcript: String,
    pub start_time: f64,
    pub end_time: f64,
    pub provenance: Vec<Provenance>,
}

/// 生成网关契约
///
/// 每个 Part 调用一次；可能以任意错误失败，由编排层用 240 秒
/// 竞速做外部兜底（见 orchestrator::generation_fanout）。
pub trait GenerationGate: Send + Sync + 'static {
    fn generate(
        &self,
        label: &str,
        kind: PartKind,
        media: &MediaReference,
    ) -> BoxFuture<'static, Result<GeneratedContent>>;
}

/// LLM 生成服务
///
/// 职责：
/// - 按出题委员会提示词调用 LLM
/// - 解析返回的 JSON 题目数据
/// - 只处理单个 Part
/// - 不出现 Vec<ExamPart>
/// - 不关心流程顺序
pub struct LlmGenerationGate {
    client: Client<OpenAIConfig>,
    model_name: String,
    resolver: SourceResolver,
}

/// 出题委员会系统提示词
const SYSTEM_INSTRUCTION: &str = "あなたは東京大学の英語入試（リスニング）作成委員です。\n\
提供されたメディアを分析し、東大第3問レベルの高度な4択問題を5問作成してください。\n\n\
【出力ルール】\n\
- 設問(question_text)と選択肢(choices, correct_answer)は必ず「英語」で作成してください。\n\
- 実際の放送内容のまとめ(actualTranscript)と解説(listening_point)は「日本語」で作成してください。\n\
- 単なる事実確認ではなく、話者の意図、論理的な帰結、抽象的な概念の理解を問う難易度の高い問題を含めてください。\n\
- 出力は必ず次の形の JSON のみ: {\"actualTranscript\": string, \"start_time\": int, \"end_time\": int, \
\"questions\": [{\"question_id\": int, \"type\": string, \"question_text\": string, \"choices\": [string], \
\"correct_answer\": string, \"listening_point\": string, \"score\": int}], \
\"sources\": [{\"title\": string, \"uri\": string}]}";

impl LlmGenerationGate {
    /// 创建新的生成服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            resolver: SourceResolver::new(),
        }
    }

    /// 构建单个 Part 的用户消息
    fn build_user_message(&self, label: &str, kind: PartKind, media: &MediaReference) -> String {
        let kind_name = match kind {
            PartKind::Lecture => "lecture",
            PartKind::Discussion => "discussion",
        };

        match media {
            MediaReference::Local { display_name, .. } => format!(
                "Analyze the locally uploaded media file \"{}\" and create English listening \
                 questions for Part {} ({}). Ensure the output matches the JSON schema.",
                display_name, label, kind_name
            ),
            _ => {
                // 远程源优先用视频 ID 作为检索标识
                let identifier = self
                    .resolver
                    .extract_youtube_id(media.locator())
                    .unwrap_or_else(|| media.locator().to_string());
                format!(
                    "Analyze Source: {}\nSection: Part {} ({})\n\n\
                     1. Find the script or core summary of this video.\n\
                     2. Select a challenging 120-180 second segment.\n\
                     3. Generate questions in English according to the system instruction and schema.",
                    identifier, label, kind_name
                )
            }
        }
    }

    /// 调用 LLM 并返回原始文本响应
    async fn send_to_llm(&self, user_message: &str) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_INSTRUCTION)
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.1)
            .max_tokens(4096u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("PARSING_ERROR: Empty response."))?;

        Ok(content.trim().to_string())
    }

    /// 从 LLM 响应中解析题目数据
    ///
    /// 容忍响应外层包着代码块围栏或说明文字，截取首尾花括号之间
    /// 的部分做 JSON 解析。
    fn parse_generation_response(&self, response: &str) -> Result<GeneratedContent> {
        let start = response.find('{');
        let end = response.rfind('}');
        let json_body = match (start, end) {
            (Some(s), Some(e)) if e > s => &response[s..=e],
            _ => anyhow::bail!("PARSING_ERROR: no JSON object in response"),
        };

        let payload: GenerationPayload = serde_json::from_str(json_body)
            .map_err(|e| anyhow::anyhow!("PARSING_ERROR: invalid JSON body: {}", e))?;

        Ok(GeneratedContent {
            questions: payload.questions,
            transcript: payload.actual_transcript,
            start_time: payload.start_time.floor(),
            end_time: payload.end_time.floor(),
            provenance: payload.sources,
        })
    }
}

impl GenerationGate for LlmGenerationGate {
    fn generate(
        &self,
        label: &str,
        kind: PartKind,
        media: &MediaReference,
    ) -> BoxFuture<'static, Result<GeneratedContent>> {
        let user_message = self.build_user_message(label, kind, media);
        let gate = Self {
            client: self.client.clone(),
            model_name: self.model_name.clone(),
            resolver: SourceResolver::new(),
        };
        let label = label.to_string();

        Box::pin(async move {
            debug!("[Part {}] 开始生成题目", label);
            let response = gate.send_to_llm(&user_message).await?;
            let content = gate.parse_generation_response(&response)?;
            debug!(
                "[Part {}] 生成完成: {} 道题，区间 {:.0}-{:.0} 秒",
                label,
                content.questions.len(),
                content.start_time,
                content.end_time
            );
            Ok(content)
        })
    }
}

/// LLM 响应的线格式
#[derive(Debug, Deserialize)]
struct GenerationPayload {
    #[serde(rename = "actualTranscript", default)]
    actual_transcript: String,
    #[serde(default)]
    start_time: f64,
    #[serde(default = "default_end_time")]
    end_time: f64,
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    sources: Vec<Provenance>,
}

/// 终点缺省为 120 秒
fn default_end_time() -> f64 {
    120.0
}
