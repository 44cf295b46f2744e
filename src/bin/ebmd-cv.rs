// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// RTSP 全屏查看器
/// RTSP stream viewer: connect → render loop → teardown
///
/// 直接运行: cargo run --bin ebmd-cv --release -- --ip 10.0.0.5 --user admin --password secret
use anyhow::Context;
use clap::Parser;
use ebmd_cv::config::Args;
use ebmd_cv::input::{StreamHandle, StreamOptions};
use ebmd_cv::renderer::{window_conf, FullscreenSurface};
use ebmd_cv::{interrupt, logging, InterruptFlag, Outcome, Viewer, ViewerSettings};
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};

/// 配置与信号处理, 失败都按未知错误退出
fn setup(args: &Args) -> anyhow::Result<(ViewerSettings, InterruptFlag)> {
    let settings = match &args.config {
        Some(path) if path.is_dir() => {
            anyhow::bail!("配置路径是目录: {}", path.display())
        }
        _ => args.settings(),
    };
    let interrupt = interrupt::install().context("注册 Ctrl-C 处理器失败")?;
    Ok((settings, interrupt))
}

fn finish(outcome: Outcome) -> ! {
    if outcome.is_success() {
        info!("ebmd-cv has finished successfully.");
    } else {
        error!("❌ ebmd-cv 异常退出: {:?}", outcome);
    }
    std::process::exit(outcome.exit_code())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init(&args.log_config()) {
        eprintln!("⚠️ 日志初始化失败: {}", e);
    }
    info!("ebmd-cv is running");

    let (settings, interrupt) = match setup(&args) {
        Ok(v) => v,
        Err(e) => {
            error!("An error occurred: {:#}", e);
            std::process::exit(1);
        }
    };

    let params = args.connection();
    info!("📹 RTSP地址: {}", params.redacted_url());

    // 先打开视频流, 成功后才创建窗口
    let mut viewer = Viewer::new(interrupt.clone());
    let options = StreamOptions::from(&settings);
    let mut stream = match viewer.connect(|| StreamHandle::open(&params, &options, interrupt)) {
        Ok(stream) => stream,
        Err(outcome) => finish(outcome),
    };
    drop(params);

    let conf = window_conf(&settings.window_title, settings.fullscreen);
    // panic 展开时收尾守卫先释放视频流和窗口, 这里只负责退出码
    let run = panic::catch_unwind(AssertUnwindSafe(|| {
        macroquad::Window::from_config(conf, async move {
            let mut surface = FullscreenSurface::new();
            let outcome = viewer.stream(&mut stream, &mut surface).await;
            drop(stream);
            finish(outcome);
        });
    }));
    if run.is_err() {
        error!("An error occurred: 渲染循环异常终止");
        std::process::exit(1);
    }

    // 事件循环在渲染循环结束前退出 (平台关闭了窗口)
    info!("ebmd-cv has finished successfully.");
}
