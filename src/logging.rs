// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 日志初始化
/// Logger set up from an explicit config value
///
/// 输出格式: `2024-05-01 12:00:00,123 - INFO - message`
use log::{LevelFilter, SetLoggerError};
use std::io::Write;

/// 日志配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// 本程序日志级别
    pub level: LevelFilter,
    /// FFmpeg 封装库的日志级别 (它很啰嗦)
    pub library_level: LevelFilter,
}

impl LogConfig {
    pub fn new(level: LevelFilter) -> Self {
        // trace 时放开 ez_ffmpeg 的日志, 否则只看警告
        let library_level = if level >= LevelFilter::Trace {
            LevelFilter::Trace
        } else {
            level.min(LevelFilter::Warn)
        };
        Self {
            level,
            library_level,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LevelFilter::Debug)
    }
}

/// 安装全局 logger, `RUST_LOG` 可以进一步覆盖
pub fn init(config: &LogConfig) -> Result<(), SetLoggerError> {
    builder(config).parse_default_env().try_init()
}

fn builder(config: &LogConfig) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(config.level)
        .filter_module("ez_ffmpeg", config.library_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                gen_time_string(),
                record.level(),
                record.args()
            )
        });
    builder
}

/// 本地时间戳, 毫秒精度
pub fn gen_time_string() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S,%3f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_level_is_capped() {
        assert_eq!(LogConfig::new(LevelFilter::Debug).library_level, LevelFilter::Warn);
        assert_eq!(LogConfig::new(LevelFilter::Error).library_level, LevelFilter::Error);
        assert_eq!(LogConfig::new(LevelFilter::Trace).library_level, LevelFilter::Trace);
        assert_eq!(LogConfig::default().level, LevelFilter::Debug);
    }

    #[test]
    fn test_only_ffmpeg_wrapper_is_capped() {
        use log::{Level, Log, Metadata};

        let logger = builder(&LogConfig::new(LevelFilter::Debug)).build();
        let enabled = |target: &str, level: Level| {
            logger.enabled(&Metadata::builder().target(target).level(level).build())
        };

        assert!(enabled("ebmd_cv::viewer", Level::Debug));
        assert!(!enabled("ebmd_cv::viewer", Level::Trace));
        assert!(enabled("ez_ffmpeg::core", Level::Warn));
        assert!(!enabled("ez_ffmpeg::core", Level::Info));
        // 其他依赖跟随全局级别
        assert!(enabled("macroquad", Level::Debug));
        assert!(enabled("wgpu_core", Level::Debug));
    }

    #[test]
    fn test_time_string_shape() {
        let ts = gen_time_string();
        // 2024-05-01 12:00:00,123
        assert_eq!(ts.len(), 23);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[19..20], ",");
    }
}
