// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 视频输入系统 (Video Input System)
///
/// FFmpeg 在自己的线程里拉流解码, 帧经容量为1的通道交给渲染循环
/// - StreamHandle: RTSP 视频流 (打开 / 取帧 / 释放)
/// - DecodeFilter: YUV420P → RGBA 帧过滤器
/// - DecodedFrame: 单帧数据
pub mod decode_filter;
pub mod decoder;
pub mod frame;

pub use decode_filter::{DecodeFilter, FrameResult};
pub use decoder::{StreamHandle, StreamOptions};
pub use frame::{yuv420p_to_rgba, DecodedFrame, Yuv420Planes};
