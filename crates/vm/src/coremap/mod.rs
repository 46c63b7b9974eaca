//! 物理帧管理（coremap）
//!
//! ## 两个阶段
//!
//! [`Coremap`] 在生命周期中经历两个阶段，由内部状态显式区分：
//!
//! 1. **窃取阶段**：帧表尚不存在，分配请求直接从可用 RAM 低端窃取，
//!    窃取来的内存永远无法回收。帧表自身需要的内存就在这一阶段之后从剩余 RAM 中划出。
//! 2. **帧表阶段**：[`Coremap::bootstrap`] 在剩余 RAM 的低端建立帧表，
//!    之后所有分配和释放都经过帧表，采用首次适配（first-fit）策略分配连续帧段。
//!
//! `bootstrap` 只能调用一次，第二次调用返回 [`VmFatal::AlreadyBootstrapped`]。
//!
//! ## 并发
//!
//! 两个阶段共用一把 [`SpinLock`]。临界区内只有簿记操作，
//! 清零、拷贝等耗时工作都在锁外完成。
//!
//! ## RAII
//!
//! [`Coremap::alloc_run`] 返回 [`FrameRun`]，drop 时自动归还整段帧。
//! 需要裸地址的调用者（例如内核通用页分配）使用
//! [`Coremap::alloc_pages`] / [`Coremap::free_pages`]。

mod frame_table;
mod run;
mod steal;

pub use frame_table::{Frame, FrameState, FrameStats};
pub use run::FrameRun;

use crate::address::{Paddr, RamRange, Vaddr};
use crate::error::{VmError, VmFatal, VmResult};
use frame_table::FrameTable;
use steal::StealAllocator;
use sync::SpinLock;

enum CoremapState {
    Stealing(StealAllocator),
    Ready {
        table: FrameTable,
        /// bootstrap 之前被窃取的内存，释放时直接泄漏
        stolen: RamRange,
    },
}

/// 物理帧管理器
///
/// 内核持有唯一一个实例（通常是 `'static`），并把引用交给需要分配物理内存的调用者。
pub struct Coremap {
    state: SpinLock<CoremapState>,
}

impl Coremap {
    /// 以可用 RAM `ram` 创建处于窃取阶段的管理器。
    ///
    /// # Safety
    /// `ram` 必须是独占的、可通过 [`ArchVmOps`](crate::ArchVmOps) 的直接映射访问的物理内存，
    /// 并且在管理器及其分配出的所有 [`FrameRun`] 的生命周期内保持有效。
    pub const unsafe fn new(ram: RamRange) -> Self {
        Self {
            state: SpinLock::new(CoremapState::Stealing(StealAllocator::new(ram))),
        }
    }

    /// 在尚未被窃取的 RAM 低端建立帧表。
    ///
    /// 帧表覆盖剩余 RAM 的全部帧，其中存放帧表自身的前缀帧被永久保留。
    pub fn bootstrap(&self) -> Result<(), VmFatal> {
        let mut state = self.state.lock();
        let steal = match &*state {
            CoremapState::Stealing(steal) => *steal,
            CoremapState::Ready { .. } => return Err(VmFatal::AlreadyBootstrapped),
        };

        // SAFETY: new 的调用者保证了 RAM 的独占性，剩余部分此后只归帧表管理
        let table = unsafe { FrameTable::build(steal.remaining())? };
        let stats = table.stats();
        let managed = table.managed();
        log::info!(
            "coremap: {} frames at [{:#x}, {:#x}), {} reserved for the table",
            stats.total,
            managed.start,
            managed.end,
            stats.reserved
        );

        *state = CoremapState::Ready {
            table,
            stolen: steal.stolen(),
        };
        Ok(())
    }

    /// 帧表是否已经建立
    pub fn is_bootstrapped(&self) -> bool {
        matches!(&*self.state.lock(), CoremapState::Ready { .. })
    }

    /// 分配 `npages` 个连续物理帧，返回首帧物理地址。
    ///
    /// 帧表建立之前从 RAM 低端窃取。分配失败时不会留下任何部分提交的帧。
    pub fn alloc_pages(&self, npages: usize) -> VmResult<Paddr> {
        let mut state = self.state.lock();
        match &mut *state {
            CoremapState::Stealing(steal) => {
                if npages == 0 {
                    return Err(VmError::InvalidArgument);
                }
                steal.steal(npages).ok_or(VmError::OutOfMemory)
            }
            CoremapState::Ready { table, .. } => table.allocate(npages),
        }
    }

    /// 释放以 `paddr` 为首帧的整段。
    ///
    /// 窃取来的内存无法回收，释放它只会记录一条警告。
    /// 释放段体帧、空闲帧或帧表之外的地址是内核缺陷，返回 [`VmFatal`]。
    pub fn free_pages(&self, paddr: Paddr) -> Result<(), VmFatal> {
        let mut state = self.state.lock();
        let stolen = match &mut *state {
            CoremapState::Stealing(steal) => steal.stolen(),
            CoremapState::Ready { table, stolen } => {
                if !contains(stolen, paddr) {
                    table.free(paddr)?;
                    return Ok(());
                }
                *stolen
            }
        };

        if contains(&stolen, paddr) {
            log::warn!("coremap: leaking stolen memory at {:?}", paddr);
            Ok(())
        } else {
            Err(VmFatal::UnmanagedAddress(paddr))
        }
    }

    /// 分配 `npages` 页并返回直接映射区的内核虚拟地址
    pub fn alloc_kpages(&self, npages: usize) -> VmResult<Vaddr> {
        self.alloc_pages(npages).map(Paddr::to_kvaddr)
    }

    /// 释放 [`Coremap::alloc_kpages`] 返回的内核虚拟地址
    pub fn free_kpages(&self, vaddr: Vaddr) -> Result<(), VmFatal> {
        self.free_pages(vaddr.kvaddr_to_paddr())
    }

    /// 分配 `npages` 个连续物理帧，返回清零后的 [`FrameRun`]
    pub fn alloc_run(&self, npages: usize) -> VmResult<FrameRun<'_>> {
        let paddr = self.alloc_pages(npages)?;
        Ok(FrameRun::new(self, paddr, npages))
    }

    /// 帧使用情况，帧表建立之前返回 `None`
    pub fn stats(&self) -> Option<FrameStats> {
        match &*self.state.lock() {
            CoremapState::Stealing(_) => None,
            CoremapState::Ready { table, .. } => Some(table.stats()),
        }
    }

    /// 查询 `paddr` 所在帧的记录快照
    pub fn frame(&self, paddr: Paddr) -> Option<Frame> {
        match &*self.state.lock() {
            CoremapState::Stealing(_) => None,
            CoremapState::Ready { table, .. } => table.frame(paddr),
        }
    }

    /// 帧表管理的物理地址范围，帧表建立之前返回 `None`
    pub fn managed_range(&self) -> Option<RamRange> {
        match &*self.state.lock() {
            CoremapState::Stealing(_) => None,
            CoremapState::Ready { table, .. } => Some(table.managed()),
        }
    }
}

fn contains(range: &RamRange, paddr: Paddr) -> bool {
    paddr >= range.start && paddr < range.end
}
