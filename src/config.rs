// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 命令行参数与查看器配置
//!
//! CLI 参数优先, 其余显示/传输参数可以放在 JSON 配置文件里

use clap::{Parser, ValueEnum};
use log::{info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;

/// RTSP 默认端口
pub const DEFAULT_PORT: &str = "554";

/// 默认窗口标题
pub const WINDOW_TITLE: &str = "RTSP Stream";

/// 默认 socket 超时(秒), 摄像头停止发送时解码线程据此退出
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// RTSP stream viewer.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "RTSP stream viewer.", long_about = None)]
pub struct Args {
    /// IP address of the target server.
    #[arg(long)]
    pub ip: String,

    /// Username for RTSP authentication.
    #[arg(long)]
    pub user: String,

    /// Password for RTSP authentication.
    #[arg(long)]
    pub password: String,

    /// Port for RTSP (optional).
    #[arg(long, default_value = DEFAULT_PORT)]
    pub port: String,

    /// JSON settings file (window title, fullscreen, transport, timeout).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show the stream in a normal window instead of full screen.
    #[arg(long)]
    pub windowed: bool,

    /// RTSP lower transport.
    #[arg(long, value_enum)]
    pub transport: Option<Transport>,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "debug")]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn connection(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.ip.clone(),
            username: self.user.clone(),
            password: self.password.clone(),
            port: self.port.clone(),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::new(self.log_level)
    }

    /// 合并配置文件与命令行 (命令行优先)
    pub fn settings(&self) -> ViewerSettings {
        let mut settings = match &self.config {
            Some(path) => ViewerSettings::load(path),
            None => ViewerSettings::default(),
        };
        if self.windowed {
            settings.fullscreen = false;
        }
        if self.transport.is_some() {
            settings.transport = self.transport;
        }
        settings
    }
}

/// 连接参数, 解析后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: String,
}

impl ConnectionParams {
    /// 大华风格的取流地址: 通道1 / 主码流 / 单播
    ///
    /// 凭据原样拼接, 不做转义, 摄像头固件依赖这个精确格式
    pub fn rtsp_url(&self) -> String {
        format_rtsp_url(&self.username, &self.password, &self.host, &self.port)
    }

    /// 日志用地址, 密码替换为 `***`
    pub fn redacted_url(&self) -> String {
        format_rtsp_url(&self.username, "***", &self.host, &self.port)
    }
}

fn format_rtsp_url(user: &str, password: &str, host: &str, port: &str) -> String {
    format!("rtsp://{user}:{password}@{host}:{port}/cam/realmonitor?channel=1&subtype=0&unicast=true")
}

/// RTSP 传输方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

/// 查看器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub window_title: String,
    pub fullscreen: bool,
    /// None = FFmpeg 默认 (先 UDP, 失败回退 TCP)
    pub transport: Option<Transport>,
    /// socket 读写超时(秒), 配置文件写 null 表示不设置
    pub timeout_secs: Option<u64>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            window_title: WINDOW_TITLE.to_string(),
            fullscreen: true,
            transport: None,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ViewerSettings {
    /// 从JSON文件加载配置
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    settings
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let settings = Self::default();
                settings.save(path);
                settings
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!("❌ 保存配置失败: {}", e);
                } else {
                    info!("💾 配置已保存到 {}", path.display());
                }
            }
            Err(e) => warn!("❌ 序列化配置失败: {}", e),
        }
    }
}
