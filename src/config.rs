/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 考试设置文件路径
    pub setup_file: String,
    /// 设置文件缺失时的默认 Part 数量
    pub default_num_parts: usize,
    /// 单个 Part 生成的硬超时（秒）
    pub generation_timeout_secs: u64,
    /// 播报网关内部超时（秒）
    pub narration_timeout_secs: u64,
    /// 两遍播放之间的等待时长（秒）
    pub wait_between_laps_secs: u32,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            setup_file: "exam_setup.toml".to_string(),
            default_num_parts: 3,
            generation_timeout_secs: 240,
            narration_timeout_secs: 10,
            wait_between_laps_secs: 30,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-3-pro-preview".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            setup_file: std::env::var("EXAM_SETUP_FILE").unwrap_or(default.setup_file),
            default_num_parts: std::env::var("DEFAULT_NUM_PARTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.default_num_parts),
            generation_timeout_secs: std::env::var("GENERATION_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.generation_timeout_secs),
            narration_timeout_secs: std::env::var("NARRATION_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.narration_timeout_secs),
            wait_between_laps_secs: std::env::var("WAIT_BETWEEN_LAPS_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.wait_between_laps_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }
}
