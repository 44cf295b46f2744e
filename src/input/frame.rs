// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 已解码帧与像素格式转换
/// Decoded frame and YUV420P → RGBA conversion

/// 已解码帧 (解码线程 → 渲染循环), 每次迭代用完即丢弃
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedFrame {
    pub rgba_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub frame_id: u64, // 帧序号, 从1开始
}

/// YUV420P 三个平面 (带步长)
pub struct Yuv420Planes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub y_stride: usize,
    pub uv_stride: usize,
}

impl Yuv420Planes<'_> {
    /// 平面长度是否足够覆盖 width x height
    pub fn covers(&self, width: usize, height: usize) -> bool {
        let chroma_w = (width + 1) / 2;
        let chroma_h = (height + 1) / 2;
        if height == 0 || width == 0 {
            return false;
        }
        self.y_stride >= width
            && self.uv_stride >= chroma_w
            && self.y.len() >= (height - 1) * self.y_stride + width
            && self.u.len() >= (chroma_h - 1) * self.uv_stride + chroma_w
            && self.v.len() >= (chroma_h - 1) * self.uv_stride + chroma_w
    }
}

/// YUV420P → RGBA (BT.601 整数近似), alpha 固定 255
///
/// `out` 长度必须是 `width * height * 4`
pub fn yuv420p_to_rgba(planes: &Yuv420Planes<'_>, width: usize, height: usize, out: &mut [u8]) {
    debug_assert!(planes.covers(width, height));
    debug_assert_eq!(out.len(), width * height * 4);

    for (row, out_row) in out.chunks_exact_mut(width * 4).take(height).enumerate() {
        let y_row = &planes.y[row * planes.y_stride..];
        let uv_off = (row >> 1) * planes.uv_stride;
        let u_row = &planes.u[uv_off..];
        let v_row = &planes.v[uv_off..];

        for (x, px) in out_row.chunks_exact_mut(4).enumerate() {
            let y_val = y_row[x] as i32;
            let u_val = u_row[x >> 1] as i32 - 128;
            let v_val = v_row[x >> 1] as i32 - 128;

            px[0] = (y_val + ((v_val * 179) >> 7)).clamp(0, 255) as u8;
            px[1] = (y_val - ((u_val * 44) >> 7) - ((v_val * 91) >> 7)).clamp(0, 255) as u8;
            px[2] = (y_val + ((u_val * 227) >> 7)).clamp(0, 255) as u8;
            px[3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_planes(y: &[u8], y_stride: usize, uv: &[u8], uv_stride: usize) -> Yuv420Planes<'_> {
        Yuv420Planes {
            y,
            u: uv,
            v: uv,
            y_stride,
            uv_stride,
        }
    }

    #[test]
    fn test_neutral_chroma_is_grey() {
        let y = [0u8, 128, 255, 64];
        let uv = [128u8];
        let planes = grey_planes(&y, 2, &uv, 1);
        let mut out = vec![0u8; 2 * 2 * 4];
        yuv420p_to_rgba(&planes, 2, 2, &mut out);
        assert_eq!(&out[0..4], &[0, 0, 0, 255]);
        assert_eq!(&out[4..8], &[128, 128, 128, 255]);
        assert_eq!(&out[8..12], &[255, 255, 255, 255]);
        assert_eq!(&out[12..16], &[64, 64, 64, 255]);
    }

    #[test]
    fn test_stride_padding_is_ignored() {
        // 每行 2 像素, 步长 4, 填充字节为 0xEE
        let y = [200u8, 200, 0xEE, 0xEE, 10, 10, 0xEE, 0xEE];
        let uv = [128u8, 0xEE];
        let planes = grey_planes(&y, 4, &uv, 2);
        assert!(planes.covers(2, 2));
        let mut out = vec![0u8; 2 * 2 * 4];
        yuv420p_to_rgba(&planes, 2, 2, &mut out);
        assert_eq!(&out[0..8], &[200, 200, 200, 255, 200, 200, 200, 255]);
        assert_eq!(&out[8..16], &[10, 10, 10, 255, 10, 10, 10, 255]);
    }

    #[test]
    fn test_strong_red_chroma() {
        let y = [76u8, 76, 76, 76];
        let u = [85u8];
        let v = [255u8];
        let planes = Yuv420Planes {
            y: &y,
            u: &u,
            v: &v,
            y_stride: 2,
            uv_stride: 1,
        };
        let mut out = vec![0u8; 16];
        yuv420p_to_rgba(&planes, 2, 2, &mut out);
        assert!(out[0] > 240, "red {}", out[0]);
        assert!(out[1] < 20, "green {}", out[1]);
        assert!(out[2] < 20, "blue {}", out[2]);
    }

    #[test]
    fn test_covers_rejects_short_planes() {
        let y = [0u8; 3];
        let uv = [128u8];
        assert!(!grey_planes(&y, 2, &uv, 1).covers(2, 2));
        assert!(!grey_planes(&y, 2, &uv, 1).covers(0, 2));
    }
}
