// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 命令行与配置文件
pub mod error; // 错误分类与退出码
pub mod input; // 视频输入系统
pub mod interrupt; // Ctrl-C
pub mod logging; // 日志
pub mod renderer; // macroquad 全屏窗口
pub mod viewer; // 主流程与收尾

pub use crate::config::{Args, ConnectionParams, ViewerSettings};
pub use crate::error::{Outcome, ViewerError};
pub use crate::input::{DecodedFrame, StreamHandle, StreamOptions};
pub use crate::interrupt::InterruptFlag;
pub use crate::logging::{gen_time_string, LogConfig};
pub use crate::renderer::FullscreenSurface;
pub use crate::viewer::{FrameSource, Surface, Viewer, ViewerState};
