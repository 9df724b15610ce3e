use anyhow::Result;
use listening_mock_exam::orchestrator::App;
use listening_mock_exam::utils::logging;
use listening_mock_exam::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
