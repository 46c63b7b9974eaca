//! 架构相关操作 trait 定义和注册

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关的虚拟内存操作
///
/// 内核架构层需要为具体平台实现此 trait（例如 MIPS 的 KSEG0 直接映射）。
pub trait ArchVmOps: Send + Sync {
    /// 将直接映射区的内核虚拟地址转换为物理地址
    fn vaddr_to_paddr(&self, vaddr: usize) -> usize;

    /// 将物理地址转换为直接映射区的内核虚拟地址
    fn paddr_to_vaddr(&self, paddr: usize) -> usize;

    /// CPU 数量
    fn num_cpus(&self) -> usize;
}

static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册架构操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_arch_ops(ops: &'static dyn ArchVmOps) {
    let ptr = ops as *const dyn ArchVmOps;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn ArchVmOps, (usize, usize)>(ptr) };
    ARCH_OPS_DATA.store(data, Ordering::Release);
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的架构操作实现
///
/// # Panics
/// 如果尚未调用 [`register_arch_ops`] 注册实现，则 panic
#[inline]
pub fn arch_ops() -> &'static dyn ArchVmOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            extern crate test_support;
            return &test_support::mock::vm::MOCK_VM_OPS;
        }
        #[cfg(not(test))]
        panic!("vm: ArchVmOps not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchVmOps>((data, vtable)) }
}
