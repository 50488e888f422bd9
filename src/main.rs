use anyhow::Result;
use form_quiz_bridge::utils::logging;
use form_quiz_bridge::{App, Config};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：传入 TOML 路径时从文件读取，否则只用环境变量
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_toml_file(Path::new(&path)).await?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(&config);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
