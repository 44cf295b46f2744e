// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 查看器主流程 (Stream Viewer)
//!
//! `Idle → Connecting → Streaming → Teardown → Terminated`
//!
//! 每次迭代: 检查 Ctrl-C → 取帧 (阻塞) → 渲染 + 等待一次刷新 → 检查退出键。
//! 视频流和窗口从进入循环起就交给 [`Teardown`] 守卫, 任何退出路径都只释放一次。

use crate::error::{Outcome, ViewerError};
use crate::input::DecodedFrame;
use crate::interrupt::InterruptFlag;
use log::{debug, error, info};

/// 帧来源 (视频流句柄)
pub trait FrameSource {
    /// 阻塞直到下一帧; 流结束返回 `StreamEnded`
    fn fetch(&mut self) -> Result<DecodedFrame, ViewerError>;
    fn is_open(&self) -> bool;
    /// 幂等, 返回本次调用是否真正释放
    fn release(&mut self) -> bool;
}

/// 显示窗口
#[allow(async_fn_in_trait)]
pub trait Surface {
    /// 渲染一帧并等待一次刷新 (约1ms的按键轮询窗口)
    async fn present(&mut self, frame: &DecodedFrame) -> Result<(), ViewerError>;
    /// 上一次刷新期间是否按下了退出键
    fn quit_requested(&self) -> bool;
    fn is_open(&self) -> bool;
    /// 幂等, 返回本次调用是否真正关闭
    fn close(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Idle,
    Connecting,
    Streaming,
    Teardown,
    Terminated,
}

pub struct Viewer {
    state: ViewerState,
    interrupt: InterruptFlag,
    frames_shown: u64,
}

impl Viewer {
    pub fn new(interrupt: InterruptFlag) -> Self {
        Self {
            state: ViewerState::Idle,
            interrupt,
            frames_shown: 0,
        }
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    fn transition(&mut self, next: ViewerState) {
        debug!("🔁 {:?} → {:?}", self.state, next);
        self.state = next;
    }

    /// 打开视频流, 不重试
    ///
    /// 失败时直接进入 `Terminated`, 此时还没有任何窗口
    pub fn connect<S, F>(&mut self, open: F) -> Result<S, Outcome>
    where
        F: FnOnce() -> Result<S, ViewerError>,
    {
        self.transition(ViewerState::Connecting);
        match open() {
            Ok(source) => Ok(source),
            Err(e) => {
                error!("❌ {}", e);
                self.transition(ViewerState::Terminated);
                // 打开失败一律按致命错误处理
                let e = match e {
                    e if e.is_fatal() => e,
                    other => ViewerError::Connection {
                        url: String::new(),
                        reason: other.to_string(),
                    },
                };
                Err(Outcome::Failed(e))
            }
        }
    }

    /// 渲染循环 + 收尾, 返回本次运行的结局
    pub async fn stream<S, D>(&mut self, source: &mut S, surface: &mut D) -> Outcome
    where
        S: FrameSource,
        D: Surface,
    {
        self.transition(ViewerState::Streaming);
        let mut guard = Teardown { source, surface };
        let outcome = self.render_loop(&mut guard).await;

        self.transition(ViewerState::Teardown);
        guard.run();
        drop(guard);

        self.transition(ViewerState::Terminated);
        outcome
    }

    async fn render_loop<S, D>(&mut self, guard: &mut Teardown<'_, S, D>) -> Outcome
    where
        S: FrameSource,
        D: Surface,
    {
        loop {
            if self.interrupt.is_raised() {
                info!("ebmd-cv received a keyboard interrupt.");
                return Outcome::Interrupted;
            }

            let frame = match guard.source.fetch() {
                Ok(frame) => frame,
                Err(e) => return self.fetch_failed(e),
            };

            if let Err(e) = guard.surface.present(&frame).await {
                error!("❌ {}", e);
                return Outcome::from(e);
            }
            self.frames_shown += 1;

            if guard.surface.quit_requested() {
                info!("⏹️ 收到退出键, 共显示 {} 帧", self.frames_shown);
                return Outcome::QuitKey;
            }
        }
    }

    fn fetch_failed(&self, e: ViewerError) -> Outcome {
        match &e {
            ViewerError::StreamEnded(_) => error!("Failed to fetch frame."),
            ViewerError::Interrupted => info!("ebmd-cv received a keyboard interrupt."),
            _ => error!("❌ {}", e),
        }
        debug!("取帧结束: {} (已显示 {} 帧)", e, self.frames_shown);
        Outcome::from(e)
    }
}

/// 收尾守卫: 正常结束时显式执行, 提前退出 (panic) 时由 Drop 执行
struct Teardown<'a, S: FrameSource, D: Surface> {
    source: &'a mut S,
    surface: &'a mut D,
}

impl<S: FrameSource, D: Surface> Teardown<'_, S, D> {
    fn run(&mut self) {
        if self.source.is_open() {
            self.source.release();
        }
        if self.surface.is_open() {
            self.surface.close();
        }
    }
}

impl<S: FrameSource, D: Surface> Drop for Teardown<'_, S, D> {
    fn drop(&mut self) {
        self.run();
    }
}
