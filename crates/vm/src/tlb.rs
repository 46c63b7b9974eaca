//! TLB 条目与硬件访问接口
//!
//! TLB 由软件管理：缺失时由 [`vm_fault`](crate::vm_fault) 计算物理地址并写入条目。
//! TLB 是每个 CPU 私有的硬件状态，改写时只需屏蔽本地中断，不需要跨核加锁。
//!
//! 跨核失效（shootdown）不受支持：本设计假设 TLB 状态永远不需要远程失效，
//! 任何 shootdown 请求都返回 [`VmFatal::ShootdownUnsupported`]。

use crate::address::{Paddr, Vaddr, page_size};
use crate::error::VmFatal;
use bitflags::bitflags;

bitflags! {
    /// EntryLo 中的控制位（MIPS 布局）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TlbFlags: usize {
        /// 可写
        const DIRTY = 1 << 10;
        /// 有效
        const VALID = 1 << 9;
    }
}

/// 无效条目使用的 EntryHi 基址，位于内核段，用户访问永远不会命中
const INVALID_EHI_BASE: usize = 0x8_0000;

/// 一条 TLB 条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlbEntry {
    /// 虚拟页起始地址
    pub vpage: Vaddr,
    /// 物理帧起始地址
    pub frame: Paddr,
    /// 控制位
    pub flags: TlbFlags,
}

impl TlbEntry {
    /// 创建一条条目
    pub fn new(vpage: Vaddr, frame: Paddr, flags: TlbFlags) -> Self {
        Self { vpage, frame, flags }
    }

    /// 第 `index` 个槽位的无效条目。
    ///
    /// 每个槽位使用不同的虚拟页，避免多个槽位出现相同的 EntryHi。
    pub fn invalid(index: usize) -> Self {
        Self {
            vpage: Vaddr::new((INVALID_EHI_BASE + index) * page_size()),
            frame: Paddr::new(0),
            flags: TlbFlags::empty(),
        }
    }

    /// 是否有效
    pub fn is_valid(&self) -> bool {
        self.flags.contains(TlbFlags::VALID)
    }

    /// 是否可写
    pub fn is_writable(&self) -> bool {
        self.flags.contains(TlbFlags::DIRTY)
    }

    /// 编码为 (EntryHi, EntryLo)
    pub fn to_raw(&self) -> (usize, usize) {
        (
            self.vpage.as_usize(),
            self.frame.as_usize() | self.flags.bits(),
        )
    }

    /// 从 (EntryHi, EntryLo) 解码
    pub fn from_raw(ehi: usize, elo: usize) -> Self {
        let mask = page_size() - 1;
        Self {
            vpage: Vaddr::new(ehi & !mask),
            frame: Paddr::new(elo & !mask),
            flags: TlbFlags::from_bits_truncate(elo),
        }
    }
}

/// 本地 CPU 的 TLB
///
/// 调用者负责在改写期间屏蔽本地中断。
pub trait Tlb {
    /// 槽位数量
    fn size(&self) -> usize;

    /// 读取第 `index` 个槽位
    fn read(&self, index: usize) -> TlbEntry;

    /// 写入第 `index` 个槽位
    fn write(&mut self, index: usize, entry: TlbEntry);

    /// 写入由硬件选择的槽位
    fn write_random(&mut self, entry: TlbEntry);
}

/// 一次针对单个虚拟页的 shootdown 请求
#[derive(Debug, Clone, Copy)]
pub struct TlbShootdown {
    /// 需要失效的虚拟页
    pub vaddr: Vaddr,
}

/// 请求所有 CPU 失效全部 TLB 条目，不受支持
pub fn vm_tlbshootdown_all() -> Result<(), VmFatal> {
    log::error!(
        "vm: TLB shootdown of all entries requested ({} cpus)",
        crate::arch_ops().num_cpus()
    );
    Err(VmFatal::ShootdownUnsupported)
}

/// 请求所有 CPU 失效一个虚拟页，不受支持
pub fn vm_tlbshootdown(ts: &TlbShootdown) -> Result<(), VmFatal> {
    log::error!("vm: TLB shootdown requested for {:?}", ts.vaddr);
    Err(VmFatal::ShootdownUnsupported)
}

#[cfg(test)]
mod test_mock {
    extern crate test_support;

    use super::{Tlb, TlbEntry};
    use test_support::mock::tlb::MockTlb;

    impl Tlb for MockTlb {
        fn size(&self) -> usize {
            MockTlb::size(self)
        }

        fn read(&self, index: usize) -> TlbEntry {
            let (ehi, elo) = MockTlb::read(self, index);
            TlbEntry::from_raw(ehi, elo)
        }

        fn write(&mut self, index: usize, entry: TlbEntry) {
            let (ehi, elo) = entry.to_raw();
            MockTlb::write(self, index, ehi, elo);
        }

        fn write_random(&mut self, entry: TlbEntry) {
            let (ehi, elo) = entry.to_raw();
            MockTlb::write_random(self, ehi, elo);
        }
    }
}
