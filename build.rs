// 构建脚本: 静态 FFmpeg 在 Windows MSVC 下需要额外的系统库
fn main() {
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        // OLE 自动化 / VFW / Secure Channel (RTSP over TLS)
        for lib in ["oleaut32", "vfw32", "secur32", "bcrypt"] {
            println!("cargo:rustc-link-lib=dylib={}", lib);
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}
