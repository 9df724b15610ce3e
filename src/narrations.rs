//! 试验播报文案
//!
//! 考试各阶段的固定播报脚本（日语）。播报顺序由 workflow 层控制。

use crate::models::exam::PartKind;

/// 考试开场白
pub const OPENING: &str = "試験を開始します。";

/// 考试说明
pub const INTRO: &str = "これから英語の聞き取り試験を始めます。試験時間は約30分です。";

/// 考试结束播报
pub const OUTRO: &str = "以上で試験を終わります。解答をやめてください。";

/// 第二遍播放开始播报
pub const SECOND_LAP: &str = "2回目の放送を開始します。";

/// 生成某个 Part 的开场播报
pub fn part_narration(label: &str, kind: PartKind) -> String {
    let kind_name = match kind {
        PartKind::Lecture => "講義",
        PartKind::Discussion => "討論",
    };
    format!(
        "Part {}。これから放送するのは、{}です。2回放送されます。1回目の放送の30秒後に2回目を放送します。メモを取っても構いません。",
        label, kind_name
    )
}

/// 生成阶段轮播的进度提示文案
pub const PROCESSING_STEPS: [&str; 5] = [
    "Google Searchで動画情報を取得中...",
    "音源のスクリプトを深層解析中...",
    "東大レベルの難解な設問を構成中...",
    "紛らわしい選択肢を設計中...",
    "最終的な模試データを検証中...",
];

/// 示例 YouTube 源（setup 文件缺失时使用）
pub const SAMPLE_URLS: [&str; 3] = [
    "https://www.youtube.com/watch?v=_GI9-J-sE5k",
    "https://www.youtube.com/watch?v=9P_Ah0S-p_Y",
    "https://www.youtube.com/watch?v=W6vA0vU0X7s",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_narration_lecture() {
        let text = part_narration("A", PartKind::Lecture);
        assert!(text.starts_with("Part A。"));
        assert!(text.contains("講義"));
    }

    #[test]
    fn test_part_narration_discussion() {
        let text = part_narration("B", PartKind::Discussion);
        assert!(text.contains("討論"));
    }
}
