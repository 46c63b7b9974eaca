//! 屏蔽中断的原始自旋锁
//!
//! 实现 [`lock_api::RawMutex`]，由 [`SpinLock`](crate::SpinLock) 包装后使用。

use crate::arch_ops;
use core::{
    hint,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// 原始自旋锁。
///
/// 加锁时先屏蔽本地中断再自旋，获得锁后把屏蔽前的中断状态存在锁内；
/// 解锁时先释放锁标志，再恢复中断状态。
/// 不可重入。
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
    /// 持锁者进入前的中断状态，只有持锁者会读写
    saved_intr: AtomicUsize,
}

impl RawSpinLock {
    /// 创建一个未上锁的自旋锁。
    pub const fn new() -> Self {
        RawSpinLock {
            locked: AtomicBool::new(false),
            saved_intr: AtomicUsize::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    // 解锁时要恢复的是加锁 CPU 的中断状态，守卫不能跨线程移动
    type GuardMarker = lock_api::GuardNoSend;

    fn lock(&self) {
        // SAFETY: 对应的 restore 在 unlock 中执行
        let saved = unsafe { arch_ops().disable_interrupts() };
        while !self.try_acquire() {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        self.saved_intr.store(saved, Ordering::Relaxed);
    }

    fn try_lock(&self) -> bool {
        // SAFETY: 失败时立即恢复，成功时在 unlock 中恢复
        let saved = unsafe { arch_ops().disable_interrupts() };
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.saved_intr.store(saved, Ordering::Relaxed);
            true
        } else {
            unsafe { arch_ops().restore_interrupts(saved) };
            false
        }
    }

    unsafe fn unlock(&self) {
        let saved = self.saved_intr.load(Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
        // SAFETY: saved 是 lock/try_lock 时保存的状态
        unsafe { arch_ops().restore_interrupts(saved) };
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;
    extern crate test_support;

    use super::*;
    use lock_api::RawMutex;
    use test_support::mock::arch::MOCK_ARCH_OPS;

    /// 中断状态是全局 mock，涉及它的测试需要串行执行
    pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_lock_unlock_restores_interrupts() {
        let _serial = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let lock = RawSpinLock::new();
        lock.lock();
        assert!(lock.is_locked());
        assert!(!MOCK_ARCH_OPS.enabled());
        unsafe { lock.unlock() };
        assert!(!lock.is_locked());
        assert!(MOCK_ARCH_OPS.enabled());
    }

    #[test]
    fn test_try_lock_fails_when_held() {
        let _serial = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let lock = RawSpinLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        // 失败的 try_lock 不应改变持锁者的中断状态
        assert!(!MOCK_ARCH_OPS.enabled());
        unsafe { lock.unlock() };
        assert!(MOCK_ARCH_OPS.enabled());
    }
}
