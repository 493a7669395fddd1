use anyhow::Result;
use iris_submit::cli::{self, Command};
use iris_submit::utils::logging;
use iris_submit::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse();

    // 加载配置，命令行参数优先
    let config = Config::from_env()?.with_cli(&args);

    // 初始化日志
    logging::init(config.verbose_logging);

    let app = App::initialize(config).await?;

    match args.command.unwrap_or(Command::Submit) {
        Command::Submit => {
            let stats = app.run().await?;
            if stats.failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Status { batch_id } => {
            if !app.run_status(&batch_id).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
