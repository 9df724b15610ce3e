//! 考试设置文件
//!
//! 从 TOML 文件加载本次会话的 Part 槽位配置（1-3 个）。

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::narrations::SAMPLE_URLS;

/// 单个槽位配置
#[derive(Debug, Clone, Deserialize)]
pub struct SlotConfig {
    /// 源字符串：流媒体 URL / 视频 ID / 任意绝对 URL
    #[serde(default)]
    pub source: String,
    /// 本地媒体文件路径（与 source 二选一，优先生效）
    #[serde(default)]
    pub file: Option<String>,
}

/// 考试设置
#[derive(Debug, Clone, Deserialize)]
pub struct ExamSetup {
    pub parts: Vec<SlotConfig>,
}

impl ExamSetup {
    /// 从 TOML 文件加载设置
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取设置文件: {}", path.display()))?;

        let setup: ExamSetup = toml::from_str(&content)
            .with_context(|| format!("无法解析设置文件: {}", path.display()))?;

        setup.validate()?;
        Ok(setup)
    }

    /// 用示例 YouTube 源构建设置（设置文件缺失时的兜底）
    pub fn sample(num_parts: usize) -> Self {
        let parts = (0..num_parts.clamp(1, 3))
            .map(|i| SlotConfig {
                source: SAMPLE_URLS[i % SAMPLE_URLS.len()].to_string(),
                file: None,
            })
            .collect();
        Self { parts }
    }

    /// 校验槽位数量与内容
    pub fn validate(&self) -> Result<()> {
        if self.parts.is_empty() || self.parts.len() > 3 {
            anyhow::bail!("Part 数量必须在 1-3 之间，当前: {}", self.parts.len());
        }
        for (i, slot) in self.parts.iter().enumerate() {
            if slot.source.trim().is_empty() && slot.file.is_none() {
                anyhow::bail!("第 {} 个槽位没有配置任何源", i + 1);
            }
        }
        Ok(())
    }

    /// 槽位标签：A、B、C...
    pub fn label_for(index: usize) -> String {
        char::from(b'A' + (index as u8 % 26)).to_string()
    }
}

/// 加载设置文件，不存在时退回示例设置
pub async fn load_or_sample(path: &Path, fallback_parts: usize) -> Result<ExamSetup> {
    if path.exists() {
        ExamSetup::load(path).await
    } else {
        info!(
            "⚠️ 未找到设置文件 {}，使用 {} 个示例源",
            path.display(),
            fallback_parts
        );
        Ok(ExamSetup::sample(fallback_parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_setup_toml() {
        let content = r#"
[[parts]]
source = "https://www.youtube.com/watch?v=_GI9-J-sE5k"

[[parts]]
file = "lecture.mp4"
"#;
        let setup: ExamSetup = toml::from_str(content).expect("设置解析失败");
        assert_eq!(setup.parts.len(), 2);
        assert!(setup.validate().is_ok());
        assert_eq!(setup.parts[1].file.as_deref(), Some("lecture.mp4"));
    }

    #[test]
    fn test_validate_rejects_too_many_parts() {
        let setup = ExamSetup {
            parts: vec![
                SlotConfig { source: "a".into(), file: None },
                SlotConfig { source: "b".into(), file: None },
                SlotConfig { source: "c".into(), file: None },
                SlotConfig { source: "d".into(), file: None },
            ],
        };
        assert!(setup.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_slot() {
        let setup = ExamSetup {
            parts: vec![SlotConfig { source: "  ".into(), file: None }],
        };
        assert!(setup.validate().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(ExamSetup::label_for(0), "A");
        assert_eq!(ExamSetup::label_for(2), "C");
    }

    #[test]
    fn test_sample_clamps() {
        assert_eq!(ExamSetup::sample(0).parts.len(), 1);
        assert_eq!(ExamSetup::sample(9).parts.len(), 3);
    }
}
