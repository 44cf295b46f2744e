// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// FFmpeg解码过滤器模块
/// FFmpeg decode filter: YUV420P frame → RGBA `DecodedFrame` → viewer channel
use super::frame::{yuv420p_to_rgba, DecodedFrame, Yuv420Planes};
use crate::error::ViewerError;
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use log::{debug, info, warn};
use std::time::Instant;

/// 解码线程交给渲染循环的数据
pub type FrameResult = Result<DecodedFrame, ViewerError>;

/// 单帧转换结果
#[derive(Debug)]
enum Converted {
    Frame(DecodedFrame),
    /// 空帧/损坏帧, 丢弃
    Dropped(&'static str),
    /// 帧布局不可用, 交给查看器当作库错误处理
    Fatal(String),
}

/// 通过检查的 YUV420P 帧布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlaneLayout {
    width: usize,
    height: usize,
    y_stride: usize,
    uv_stride: usize,
}

impl PlaneLayout {
    fn chroma_size(&self) -> (usize, usize) {
        ((self.width + 1) / 2, (self.height + 1) / 2)
    }

    /// Y 平面需要读取的字节数 (最后一行不含填充)
    fn y_len(&self) -> usize {
        (self.height - 1) * self.y_stride + self.width
    }

    /// U / V 平面各自需要读取的字节数
    fn uv_len(&self) -> usize {
        let (chroma_w, chroma_h) = self.chroma_size();
        (chroma_h - 1) * self.uv_stride + chroma_w
    }
}

/// 检查分辨率 / 步长 / 平面指针
///
/// 分辨率非法的帧直接丢弃; 平面缺失或步长小于行宽说明帧布局不可用
fn check_layout(
    width: i32,
    height: i32,
    y_stride: i32,
    uv_stride: i32,
    planes_non_null: bool,
) -> Result<PlaneLayout, Converted> {
    if width <= 0 || height <= 0 {
        return Err(Converted::Dropped("非法分辨率"));
    }
    let (w, h) = (width as usize, height as usize);
    if !planes_non_null {
        return Err(Converted::Fatal(format!("YUV指针为空 ({}x{})", w, h)));
    }

    let chroma_w = (w + 1) / 2;
    if y_stride <= 0 || uv_stride <= 0 || (y_stride as usize) < w || (uv_stride as usize) < chroma_w {
        return Err(Converted::Fatal(format!(
            "步长异常 y_stride={} uv_stride={} ({}x{})",
            y_stride, uv_stride, w, h
        )));
    }

    Ok(PlaneLayout {
        width: w,
        height: h,
        y_stride: y_stride as usize,
        uv_stride: uv_stride as usize,
    })
}

/// 按已检查的布局转换, 平面长度不足时返回 `Fatal`
fn convert_planes(planes: &Yuv420Planes<'_>, layout: PlaneLayout, frame_id: u64) -> Converted {
    let PlaneLayout { width, height, .. } = layout;
    if !planes.covers(width, height) {
        return Converted::Fatal(format!("YUV平面长度不足 ({}x{})", width, height));
    }
    let mut rgba_data = vec![0u8; width * height * 4];
    yuv420p_to_rgba(planes, width, height, &mut rgba_data);
    Converted::Frame(DecodedFrame {
        rgba_data,
        width: width as u32,
        height: height as u32,
        frame_id,
    })
}

/// FFmpeg解码过滤器: RTSP流 → RGBA帧
pub struct DecodeFilter {
    sender: Option<Sender<FrameResult>>, // uninit 时取走, 通道随之断开
    frame_id: u64,
    count: usize,
    last: Instant,
    current_fps: f64,
    dropped_frames: usize,
    total_frames: usize,
}

impl DecodeFilter {
    pub fn new(sender: Sender<FrameResult>) -> Self {
        Self {
            sender: Some(sender),
            frame_id: 0,
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
            dropped_frames: 0,
            total_frames: 0,
        }
    }

    /// 读取 AVFrame 并转换为 RGBA
    ///
    /// # Safety
    /// `frame` 必须是 FFmpeg 刚交付的有效视频帧 (format=yuv420p)
    unsafe fn convert(&mut self, frame: &Frame) -> Converted {
        if frame.as_ptr().is_null() || frame.is_empty() {
            return Converted::Dropped("空帧");
        }
        if frame.is_corrupt() {
            return Converted::Dropped("损坏帧");
        }

        let raw = &*frame.as_ptr();

        // 只丢弃严重错误的帧 (缺少参考帧、无效比特流)
        if raw.decode_error_flags & 0x03 != 0 {
            return Converted::Dropped("解码错误标志");
        }

        let (y_plane, u_plane, v_plane) = (raw.data[0], raw.data[1], raw.data[2]);
        let planes_non_null = !y_plane.is_null() && !u_plane.is_null() && !v_plane.is_null();
        let layout = match check_layout(
            raw.width,
            raw.height,
            raw.linesize[0],
            raw.linesize[1],
            planes_non_null,
        ) {
            Ok(layout) => layout,
            Err(rejected) => return rejected,
        };

        let uv_len = layout.uv_len();
        let planes = Yuv420Planes {
            y: std::slice::from_raw_parts(y_plane, layout.y_len()),
            u: std::slice::from_raw_parts(u_plane, uv_len),
            v: std::slice::from_raw_parts(v_plane, uv_len),
            y_stride: layout.y_stride,
            uv_stride: layout.uv_stride,
        };

        let converted = convert_planes(&planes, layout, self.frame_id + 1);
        if matches!(converted, Converted::Frame(_)) {
            self.frame_id += 1;
        }
        converted
    }

    /// 每秒打印一次解码统计
    fn update_stats(&mut self) {
        self.count += 1;
        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.current_fps = self.count as f64 / elapsed;
            let drop_rate = self.dropped_frames as f64 / self.total_frames.max(1) as f64 * 100.0;
            debug!(
                "📺 解码统计: 解码{}帧 | 实际{:.1}fps | 总帧{} | 丢弃{} ({:.1}%)",
                self.count, self.current_fps, self.total_frames, self.dropped_frames, drop_rate
            );
            self.last = Instant::now();
            self.count = 0;
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.sender.is_none() {
            return Err("viewer closed".to_string());
        }
        self.total_frames += 1;

        let item = match unsafe { self.convert(&frame) } {
            Converted::Frame(decoded) => {
                self.update_stats();
                Ok(decoded)
            }
            Converted::Dropped(reason) => {
                self.dropped_frames += 1;
                if self.total_frames <= 10 {
                    warn!("⚠️ 丢弃帧 #{}: {}", self.total_frames, reason);
                }
                return Ok(None);
            }
            Converted::Fatal(msg) => Err(ViewerError::Library(msg)),
        };
        let fatal = item.is_err();

        // 阻塞直到渲染循环取走上一帧; 接收端已释放则停止解码
        if let Some(sender) = &self.sender {
            sender
                .send(item)
                .map_err(|_| "viewer closed".to_string())?;
        }
        if fatal {
            self.sender.take();
            return Err("undecodable frame layout".to_string());
        }

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        self.sender.take();
        info!(
            "✅ 解码线程退出 (总帧{} | 丢弃{})",
            self.total_frames, self.dropped_frames
        );
    }
}
