// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// Ctrl-C 处理: 信号线程只置位标志, 渲染循环每次迭代检查一次, 等帧时每100ms检查一次
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 注册 Ctrl-C 处理器 (每个进程只能注册一次)
pub fn install() -> Result<InterruptFlag, ctrlc::Error> {
    let flag = InterruptFlag::default();
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || handler_flag.raise())?;
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = InterruptFlag::default();
        let other = flag.clone();
        assert!(!other.is_raised());
        flag.raise();
        assert!(other.is_raised());
    }
}
