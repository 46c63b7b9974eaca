//! 虚拟内存相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `vm` crate（避免循环依赖）。
//! `vm` crate 在 `cfg(test)` 下为这些类型实现其 trait（`ArchVmOps` / `VmConfig`）。

/// Mock 的架构操作
///
/// 直接映射采用恒等映射（vaddr == paddr），配合 [`MockRam`](super::ram::MockRam)
/// 使用时"物理地址"就是宿主堆上的真实地址。
pub struct MockVmOps;

impl MockVmOps {
    pub const fn new() -> Self {
        Self
    }

    pub fn vaddr_to_paddr(&self, vaddr: usize) -> usize {
        vaddr
    }

    pub fn paddr_to_vaddr(&self, paddr: usize) -> usize {
        paddr
    }

    pub fn num_cpus(&self) -> usize {
        1
    }
}

/// 全局 Mock 实例
pub static MOCK_VM_OPS: MockVmOps = MockVmOps::new();

/// Mock 的布局配置
pub struct MockVmConfig;

impl MockVmConfig {
    pub const fn new() -> Self {
        Self
    }

    pub fn page_size(&self) -> usize {
        4096
    }

    pub fn user_stack_top(&self) -> usize {
        0x8000_0000
    }

    pub fn stack_pages(&self) -> usize {
        12
    }
}

/// 全局 Mock 实例
pub static MOCK_VM_CONFIG: MockVmConfig = MockVmConfig::new();
