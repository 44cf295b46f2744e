// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 渲染器 (macroquad 全屏窗口)
/// Full-screen display surface: draw frame, poll `q`, close
use crate::error::ViewerError;
use crate::input::DecodedFrame;
use crate::viewer::Surface;
use log::{debug, info};
use macroquad::prelude::*;
use std::time::Instant;

/// 非全屏时的初始窗口尺寸
pub const WINDOW_WIDTH: i32 = 1280;
pub const WINDOW_HEIGHT: i32 = 720;

/// 窗口配置, 在打开视频流之后才交给 macroquad 创建窗口
pub fn window_conf(title: &str, fullscreen: bool) -> Conf {
    Conf {
        window_title: title.to_string(),
        window_width: WINDOW_WIDTH,
        window_height: WINDOW_HEIGHT,
        fullscreen,
        high_dpi: true,
        ..Default::default()
    }
}

/// 纹理尺寸: 宽高要放得进 u16, 像素数据必须正好 w*h*4 字节
pub fn texture_size(frame: &DecodedFrame) -> Result<(u16, u16), ViewerError> {
    let invalid = || {
        ViewerError::Library(format!(
            "帧尺寸异常: {}x{}, {} 字节",
            frame.width,
            frame.height,
            frame.rgba_data.len()
        ))
    };
    let width = u16::try_from(frame.width).map_err(|_| invalid())?;
    let height = u16::try_from(frame.height).map_err(|_| invalid())?;
    if width == 0 || height == 0 || frame.rgba_data.len() != width as usize * height as usize * 4 {
        return Err(invalid());
    }
    Ok((width, height))
}

/// 唯一的显示窗口
pub struct FullscreenSurface {
    last_frame: Option<Texture2D>,
    quit: bool,
    open: bool,
    render_count: u64,
    render_last: Instant,
    render_fps: f64,
}

impl FullscreenSurface {
    pub fn new() -> Self {
        // 窗口关闭按钮交给渲染循环处理, 保证收尾逻辑执行
        prevent_quit();
        info!("🎨 渲染器启动 ({}x{})", screen_width(), screen_height());
        Self {
            last_frame: None,
            quit: false,
            open: true,
            render_count: 0,
            render_last: Instant::now(),
            render_fps: 0.0,
        }
    }

    /// 只在分辨率变化时重建纹理, 否则更新像素数据
    fn upload(&mut self, frame: &DecodedFrame, width: u16, height: u16) {
        let needs_rebuild = match &self.last_frame {
            Some(tex) => tex.width() != frame.width as f32 || tex.height() != frame.height as f32,
            None => true,
        };

        if needs_rebuild {
            let texture = Texture2D::from_rgba8(width, height, &frame.rgba_data);
            texture.set_filter(FilterMode::Linear);
            info!("📐 视频分辨率: {}x{}", frame.width, frame.height);
            self.last_frame = Some(texture);
        } else if let Some(tex) = &self.last_frame {
            let img = Image {
                bytes: frame.rgba_data.clone(),
                width,
                height,
            };
            tex.update(&img);
        }
    }

    fn update_fps(&mut self) {
        self.render_count += 1;
        let elapsed = self.render_last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.render_fps = self.render_count as f64 / elapsed;
            debug!("🖥️ 渲染 {:.1}fps", self.render_fps);
            self.render_count = 0;
            self.render_last = Instant::now();
        }
    }
}

impl Default for FullscreenSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for FullscreenSurface {
    async fn present(&mut self, frame: &DecodedFrame) -> Result<(), ViewerError> {
        if !self.open {
            return Err(ViewerError::Unknown("窗口已关闭".to_string()));
        }
        let (width, height) = texture_size(frame)?;
        self.upload(frame, width, height);

        clear_background(BLACK);
        if let Some(tex) = &self.last_frame {
            // GPU缩放到窗口
            draw_texture_ex(
                tex,
                0.0,
                0.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(screen_width(), screen_height())),
                    ..Default::default()
                },
            );
        }

        // 一次刷新就是按键轮询的等待窗口
        next_frame().await;

        self.quit = is_key_pressed(KeyCode::Q) || is_quit_requested();
        self.update_fps();
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        self.last_frame = None;
        macroquad::miniquad::window::order_quit();
        info!("🪟 窗口已关闭");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, len: usize) -> DecodedFrame {
        DecodedFrame {
            rgba_data: vec![0; len],
            width,
            height,
            frame_id: 1,
        }
    }

    #[test]
    fn test_texture_size_accepts_exact_buffer() {
        assert_eq!(texture_size(&frame(1280, 720, 1280 * 720 * 4)).unwrap(), (1280, 720));
        assert_eq!(texture_size(&frame(3, 3, 36)).unwrap(), (3, 3));
    }

    #[test]
    fn test_texture_size_rejects_bad_frames() {
        // 缓冲区长度不符
        assert!(matches!(texture_size(&frame(2, 2, 15)), Err(ViewerError::Library(_))));
        assert!(matches!(texture_size(&frame(2, 2, 17)), Err(ViewerError::Library(_))));
        // 超出纹理尺寸上限
        assert!(matches!(texture_size(&frame(70_000, 1, 280_000)), Err(ViewerError::Library(_))));
        assert!(matches!(texture_size(&frame(1, 70_000, 280_000)), Err(ViewerError::Library(_))));
        assert!(matches!(texture_size(&frame(0, 0, 0)), Err(ViewerError::Library(_))));
    }

    #[test]
    fn test_window_conf() {
        let conf = window_conf("Gate", false);
        assert_eq!(conf.window_title, "Gate");
        assert!(!conf.fullscreen);
        assert_eq!((conf.window_width, conf.window_height), (WINDOW_WIDTH, WINDOW_HEIGHT));
    }
}
