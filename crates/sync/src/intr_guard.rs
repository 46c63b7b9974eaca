//! 中断保护器
//!
//! 屏蔽中断只能阻止**本地 CPU** 上"内核线程 vs 本地中断"的并发，
//! 不能阻止其他 CPU 的并行访问。每核私有的硬件状态（如 TLB）用它保护即可；
//! 多核共享的数据需要 [`SpinLock`](crate::SpinLock)。
//!
//! 持有 [`IntrGuard`] 期间不得执行任何可能阻塞的操作。

use crate::arch_ops;

/// 中断保护器，创建时屏蔽本地中断，销毁时恢复之前的状态。
///
/// 可以嵌套：内层保护器销毁时恢复的是"外层已屏蔽"的状态，
/// 只有最外层销毁后中断才会重新开启。
///
/// ```ignore
/// {
///     let _guard = IntrGuard::new();
///     // 改写 TLB
/// } // 恢复中断
/// ```
pub struct IntrGuard {
    saved: usize,
}

impl IntrGuard {
    /// 屏蔽本地中断并返回保护器。
    pub fn new() -> Self {
        // SAFETY: saved 只会在 Drop 中原样交还，满足后进先出的恢复顺序
        let saved = unsafe { arch_ops().disable_interrupts() };
        IntrGuard { saved }
    }

    /// 进入临界区之前中断是否开启。
    pub fn was_enabled(&self) -> bool {
        arch_ops().interrupts_enabled(self.saved)
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        // SAFETY: saved 来自构造时的 disable_interrupts
        unsafe { arch_ops().restore_interrupts(self.saved) };
    }
}

/// 在屏蔽本地中断的情况下执行 `f`。
pub fn with_intr_disabled<R>(f: impl FnOnce() -> R) -> R {
    let _guard = IntrGuard::new();
    f()
}
