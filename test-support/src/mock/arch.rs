//! 中断控制的 Mock 实现

use core::sync::atomic::{AtomicUsize, Ordering};

/// Mock 中断控制
///
/// 用屏蔽深度代替真实的中断使能位：深度为 0 表示中断开启。
/// 多个测试线程并发加解锁时深度依然能正确归零。
pub struct MockArchOps {
    pub disable_depth: AtomicUsize,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            disable_depth: AtomicUsize::new(0),
        }
    }

    /// 屏蔽中断，返回屏蔽前是否开启（1 = 开启）
    pub fn disable(&self) -> usize {
        (self.disable_depth.fetch_add(1, Ordering::SeqCst) == 0) as usize
    }

    /// 撤销一次屏蔽
    pub fn restore(&self, _saved: usize) {
        self.disable_depth.fetch_sub(1, Ordering::SeqCst);
    }

    /// 当前中断是否开启
    pub fn enabled(&self) -> bool {
        self.disable_depth.load(Ordering::SeqCst) == 0
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
