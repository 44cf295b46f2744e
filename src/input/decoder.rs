// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// RTSP主动拉流解码器
/// RTSP stream handle: open / fetch / release over an ez-ffmpeg pipeline
use super::decode_filter::{DecodeFilter, FrameResult};
use super::frame::DecodedFrame;
use crate::config::{ConnectionParams, Transport, ViewerSettings};
use crate::error::ViewerError;
use crate::interrupt::InterruptFlag;
use crate::viewer::FrameSource;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::core::scheduler::ffmpeg_scheduler::{FfmpegScheduler, Running};
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use log::{debug, info};
use std::collections::HashMap;
use std::time::Duration;

/// 等帧期间检查 Ctrl-C 的间隔
const FETCH_POLL: Duration = Duration::from_millis(100);

/// 输入参数 (传给 FFmpeg 的 demuxer 选项)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    pub transport: Option<Transport>,
    pub timeout_secs: Option<u64>,
}

impl StreamOptions {
    pub fn input_opts(&self) -> HashMap<String, String> {
        let mut opts = HashMap::new();
        if let Some(transport) = self.transport {
            opts.insert("rtsp_transport".to_string(), transport.as_str().to_string());
        }
        if let Some(secs) = self.timeout_secs {
            // FFmpeg 的 rtsp timeout 单位是微秒
            opts.insert("timeout".to_string(), (secs * 1_000_000).to_string());
        }
        opts
    }
}

impl From<&ViewerSettings> for StreamOptions {
    fn from(settings: &ViewerSettings) -> Self {
        Self {
            transport: settings.transport,
            timeout_secs: settings.timeout_secs,
        }
    }
}

/// 已打开的视频流, 只由主流程持有
pub struct StreamHandle {
    frames: Option<Receiver<FrameResult>>,
    scheduler: Option<FfmpegScheduler<Running>>,
    interrupt: InterruptFlag,
    released: bool,
}

impl StreamHandle {
    /// 打开视频流并启动解码
    ///
    /// 输入打不开 → `Connection`; 打开了但流水线起不来 → `Library`。
    /// 等帧时遇到 `interrupt` 置位则返回 `Interrupted`
    pub fn open(
        params: &ConnectionParams,
        options: &StreamOptions,
        interrupt: InterruptFlag,
    ) -> Result<Self, ViewerError> {
        let url = params.rtsp_url();
        let redacted = params.redacted_url();
        // FFmpeg 的错误信息里可能带完整地址
        let scrub = |e: &dyn std::fmt::Display| e.to_string().replace(&url, &redacted);

        let (tx, rx) = bounded::<FrameResult>(1);
        let filter = DecodeFilter::new(tx);

        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("decode", Box::new(filter));
        let out = create_null_output().add_frame_pipeline(pipe);

        let mut input = Input::new(url.as_str());
        let opts = options.input_opts();
        if !opts.is_empty() {
            debug!("⚙️ 输入选项: {:?}", opts);
            input = input.set_input_opts(opts);
        }

        let ctx = FfmpegContext::builder()
            .input(input)
            .filter_desc("format=yuv420p")
            .output(out)
            .build()
            .map_err(|e| ViewerError::Connection {
                url: redacted.clone(),
                reason: scrub(&e),
            })?;

        let scheduler = ctx
            .start()
            .map_err(|e| ViewerError::Library(format!("启动失败: {}", scrub(&e))))?;

        info!("✅ 视频流已打开: {}", redacted);
        Ok(Self {
            frames: Some(rx),
            scheduler: Some(scheduler),
            interrupt,
            released: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_receiver(frames: Receiver<FrameResult>, interrupt: InterruptFlag) -> Self {
        Self {
            frames: Some(frames),
            scheduler: None,
            interrupt,
            released: false,
        }
    }
}

impl FrameSource for StreamHandle {
    fn fetch(&mut self) -> Result<DecodedFrame, ViewerError> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| ViewerError::Unknown("视频流已释放".to_string()))?;
        // 摄像头不再发送时解码线程可能长时间卡住, 不能无限期阻塞
        loop {
            match frames.recv_timeout(FETCH_POLL) {
                Ok(item) => return item,
                Err(RecvTimeoutError::Timeout) => {
                    if self.interrupt.is_raised() {
                        return Err(ViewerError::Interrupted);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ViewerError::StreamEnded("解码器已关闭视频流".to_string()));
                }
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.released
    }

    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;

        // 先断开通道, 阻塞在 send 上的解码线程会立即返回
        drop(self.frames.take());
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.abort();
        }
        info!("🛑 视频流已释放");
        true
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u64) -> DecodedFrame {
        DecodedFrame {
            rgba_data: vec![0, 0, 0, 255],
            width: 1,
            height: 1,
            frame_id: id,
        }
    }

    #[test]
    fn test_input_opts() {
        assert!(StreamOptions::default().input_opts().is_empty());

        // 默认配置总会带上 socket 超时
        let opts = StreamOptions::from(&ViewerSettings::default()).input_opts();
        assert_eq!(opts.get("timeout").map(String::as_str), Some("30000000"));
        assert!(!opts.contains_key("rtsp_transport"));

        let opts = StreamOptions {
            transport: Some(Transport::Tcp),
            timeout_secs: Some(5),
        }
        .input_opts();
        assert_eq!(opts.get("rtsp_transport").map(String::as_str), Some("tcp"));
        assert_eq!(opts.get("timeout").map(String::as_str), Some("5000000"));
    }

    #[test]
    fn test_fetch_until_decoder_closes() {
        let (tx, rx) = bounded(2);
        let mut handle = StreamHandle::from_receiver(rx, InterruptFlag::default());
        tx.send(Ok(frame(1))).unwrap();
        drop(tx);

        assert_eq!(handle.fetch().unwrap().frame_id, 1);
        assert!(matches!(handle.fetch(), Err(ViewerError::StreamEnded(_))));
    }

    #[test]
    fn test_library_error_passes_through() {
        let (tx, rx) = bounded(1);
        let mut handle = StreamHandle::from_receiver(rx, InterruptFlag::default());
        tx.send(Err(ViewerError::Library("bad stride".into()))).unwrap();
        assert!(matches!(handle.fetch(), Err(ViewerError::Library(_))));
    }

    #[test]
    fn test_release_once_and_no_reads_after() {
        let (tx, rx) = bounded(1);
        let mut handle = StreamHandle::from_receiver(rx, InterruptFlag::default());
        assert!(handle.is_open());
        assert!(handle.release());
        assert!(!handle.release());
        assert!(!handle.is_open());

        // 接收端已丢弃, 解码线程的发送会失败
        assert!(tx.send(Ok(frame(1))).is_err());
        assert!(matches!(handle.fetch(), Err(ViewerError::Unknown(_))));
    }

    #[test]
    fn test_stalled_stream_returns_on_interrupt() {
        let (tx, rx) = bounded::<FrameResult>(1);
        let flag = InterruptFlag::default();
        let mut handle = StreamHandle::from_receiver(rx, flag.clone());

        // 解码线程还连着, 但一直不发帧
        let raiser = {
            let flag = flag.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                flag.raise();
            })
        };
        assert!(matches!(handle.fetch(), Err(ViewerError::Interrupted)));
        raiser.join().unwrap();
        drop(tx);
    }

    #[test]
    fn test_queued_frame_wins_over_interrupt() {
        let (tx, rx) = bounded(1);
        let flag = InterruptFlag::default();
        let mut handle = StreamHandle::from_receiver(rx, flag.clone());
        tx.send(Ok(frame(7))).unwrap();
        flag.raise();
        assert_eq!(handle.fetch().unwrap().frame_id, 7);
        assert!(matches!(handle.fetch(), Err(ViewerError::Interrupted)));
    }
}
