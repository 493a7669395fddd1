use crate::aggregator::TotalStrategy;
use crate::cli::CliArgs;
use crate::error::{AppResult, ConfigError};
use std::str::FromStr;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// Iris API 根地址
    pub api_base_url: String,
    /// 提交文件（TOML）存放目录
    pub submission_folder: String,
    /// 同时处理的提交数量
    pub max_concurrent_submissions: usize,
    /// 状态轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 最多轮询次数，0 表示不限
    pub max_poll_rounds: usize,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 结果文件下载目录，为空则不下载
    pub download_folder: Option<String>,
    /// 预期任务总数的计算方式
    pub total_strategy: TotalStrategy,
    /// 注册前是否对照服务端任务目录校验流水线
    pub validate_tasks: bool,
    /// 不连接服务端，使用内置模拟响应
    pub dry_run: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 失败文档记录文件
    pub failure_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            submission_folder: "submissions".to_string(),
            max_concurrent_submissions: 4,
            poll_interval_secs: 5,
            max_poll_rounds: 0,
            request_timeout_secs: 60,
            download_folder: None,
            total_strategy: TotalStrategy::AncestorWeighted,
            validate_tasks: false,
            dry_run: false,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            failure_log_file: "warn.txt".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    ///
    /// 已设置但无法解析的值返回 `ConfigError::EnvVarParseFailed`
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        Ok(Self {
            api_base_url: std::env::var("IRIS_API_BASE_URL").unwrap_or(default.api_base_url),
            submission_folder: std::env::var("SUBMISSION_FOLDER").unwrap_or(default.submission_folder),
            max_concurrent_submissions: env_or("MAX_CONCURRENT_SUBMISSIONS", "usize", default.max_concurrent_submissions)?,
            poll_interval_secs: env_or("POLL_INTERVAL_SECS", "u64", default.poll_interval_secs)?,
            max_poll_rounds: env_or("MAX_POLL_ROUNDS", "usize", default.max_poll_rounds)?,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", "u64", default.request_timeout_secs)?,
            download_folder: std::env::var("DOWNLOAD_FOLDER").ok().filter(|v| !v.is_empty()).or(default.download_folder),
            total_strategy: env_or("TOTAL_STRATEGY", "weighted|exact", default.total_strategy)?,
            validate_tasks: env_or("VALIDATE_TASKS", "bool", default.validate_tasks)?,
            dry_run: env_or("DRY_RUN", "bool", default.dry_run)?,
            verbose_logging: env_or("VERBOSE_LOGGING", "bool", default.verbose_logging)?,
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            failure_log_file: std::env::var("FAILURE_LOG_FILE").unwrap_or(default.failure_log_file),
        })
    }

    /// 用命令行参数覆盖环境变量配置
    pub fn with_cli(mut self, args: &CliArgs) -> Self {
        if let Some(api) = &args.api {
            self.api_base_url = api.clone();
        }
        if let Some(folder) = &args.folder {
            self.submission_folder = folder.clone();
        }
        if let Some(download) = &args.download {
            self.download_folder = Some(download.clone());
        }
        if let Some(strategy) = args.total_strategy {
            self.total_strategy = strategy;
        }
        if args.dry_run {
            self.dry_run = true;
        }
        if args.verbose {
            self.verbose_logging = true;
        }
        self
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "IRIS_API_BASE_URL".to_string(),
                reason: format!("需要 http(s) 地址，实际为 '{}'", self.api_base_url),
            }
            .into());
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "REQUEST_TIMEOUT_SECS".to_string(),
                reason: "超时时间必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_or<T: FromStr>(var_name: &str, expected_type: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => parse_value(var_name, expected_type, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var_name: &str, expected_type: &str, value: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::try_parse_from([
            "iris-submit",
            "--api",
            "http://iris.example:8080",
            "--download",
            "out",
            "--total-strategy",
            "exact",
            "-v",
        ])
        .unwrap();
        let config = Config::default().with_cli(&args);

        assert_eq!(config.api_base_url, "http://iris.example:8080");
        assert_eq!(config.download_folder.as_deref(), Some("out"));
        assert_eq!(config.total_strategy, TotalStrategy::ExactDescendants);
        assert!(config.verbose_logging);
        assert!(!config.dry_run);
        assert_eq!(config.submission_folder, "submissions");
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        use crate::error::AppError;

        let err = parse_value::<TotalStrategy>("TOTAL_STRATEGY", "weighted|exact", "fastest").unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::EnvVarParseFailed { ref var_name, .. }) if var_name == "TOTAL_STRATEGY"
        ));
        assert!(err.to_string().contains("fastest"));

        assert_eq!(parse_value::<u64>("POLL_INTERVAL_SECS", "u64", " 10 ").unwrap(), 10);
        assert!(parse_value::<bool>("DRY_RUN", "bool", "yes").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            api_base_url: "iris.local".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
