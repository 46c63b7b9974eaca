//! 自旋锁封装
//!
//! [`SpinLock`] 是以 [`RawSpinLock`] 为底层的 [`lock_api::Mutex`]。
//! 持锁期间本地中断被屏蔽，因此临界区内只能做簿记工作，不得执行 I/O 或睡眠。

use crate::raw_spin_lock::RawSpinLock;

/// 提供互斥访问的自旋锁。
///
/// ```ignore
/// static COUNTER: SpinLock<usize> = SpinLock::new(0);
/// *COUNTER.lock() += 1;
/// ```
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// [`SpinLock`] 的 RAII 守卫，离开作用域时释放锁并恢复中断。
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
