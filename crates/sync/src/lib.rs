//! 同步原语
//!
//! 为虚拟内存子系统提供两类互斥手段：
//!
//! - [`IntrGuard`]：只屏蔽**本地 CPU** 的中断，用于保护每核私有的硬件状态（例如 TLB）。
//! - [`SpinLock`]：跨 CPU 的互斥锁，持锁期间同时屏蔽本地中断，用于保护全局簿记数据（例如帧表）。
//!
//! # 架构依赖
//!
//! 中断控制通过 [`ArchOps`] trait 抽象。
//! 使用前必须调用 [`register_arch_ops`] 注册实现。

#![no_std]

mod intr_guard;
mod raw_spin_lock;
mod spin_lock;

pub use intr_guard::{IntrGuard, with_intr_disabled};
pub use raw_spin_lock::RawSpinLock;
pub use spin_lock::{SpinLock, SpinLockGuard};

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关的中断控制操作
///
/// 由内核的架构层实现并注册。
pub trait ArchOps: Send + Sync {
    /// 屏蔽本地 CPU 的中断，返回屏蔽前的中断状态
    ///
    /// # Safety
    /// 返回值只能交还给 [`ArchOps::restore_interrupts`]，且恢复顺序必须与屏蔽顺序相反。
    unsafe fn disable_interrupts(&self) -> usize;

    /// 将本地 CPU 的中断状态恢复为 `saved`
    ///
    /// # Safety
    /// `saved` 必须是先前 [`ArchOps::disable_interrupts`] 的返回值。
    unsafe fn restore_interrupts(&self, saved: usize);

    /// 判断保存的中断状态中中断是否处于开启状态
    fn interrupts_enabled(&self, saved: usize) -> bool;
}

static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册中断控制实现
///
/// # Safety
/// 必须在单线程环境下、任何加锁操作之前调用。
pub unsafe fn register_arch_ops(ops: &'static dyn ArchOps) {
    let ptr = ops as *const dyn ArchOps;
    // SAFETY: fat pointer 的布局是 (data, vtable)
    let (data, vtable) = unsafe { core::mem::transmute::<*const dyn ArchOps, (usize, usize)>(ptr) };
    ARCH_OPS_DATA.store(data, Ordering::Release);
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 是否已经注册了中断控制实现
pub fn arch_ops_registered() -> bool {
    ARCH_OPS_DATA.load(Ordering::Acquire) != 0
}

#[inline]
pub(crate) fn arch_ops() -> &'static dyn ArchOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            extern crate test_support;
            return &test_support::mock::arch::MOCK_ARCH_OPS;
        }
        #[cfg(not(test))]
        panic!("sync: ArchOps not registered, call register_arch_ops first");
    }
    // SAFETY: data 和 vtable 由 register_arch_ops 写入，指向 'static 对象
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchOps>((data, vtable)) }
}
