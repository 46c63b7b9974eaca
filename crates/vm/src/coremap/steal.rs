//! 启动期窃取分配器
//!
//! 帧表建立之前，内存只能从可用 RAM 的低端"窃取"：游标单调递增，没有对应的释放操作。
//! 被窃取的内存永远不会回到帧表中。

use crate::address::{Paddr, RamRange, page_size};

#[derive(Debug, Clone, Copy)]
pub(super) struct StealAllocator {
    /// 最初的可用 RAM 起点
    origin: Paddr,
    /// 下一次窃取的起点
    next: Paddr,
    end: Paddr,
}

impl StealAllocator {
    pub(super) const fn new(ram: RamRange) -> Self {
        Self {
            origin: ram.start,
            next: ram.start,
            end: ram.end,
        }
    }

    /// 从低端窃取 `npages` 页，空间不足时返回 `None`
    pub(super) fn steal(&mut self, npages: usize) -> Option<Paddr> {
        let start = self.next.page_ceil();
        let bytes = npages.checked_mul(page_size())?;
        let end = start.checked_add(bytes)?;
        if end > self.end {
            return None;
        }
        self.next = end;
        Some(start)
    }

    /// 尚未被窃取的 RAM
    pub(super) fn remaining(&self) -> RamRange {
        RamRange::new(self.next, self.end)
    }

    /// 已经被窃取的 RAM
    pub(super) fn stolen(&self) -> RamRange {
        RamRange::new(self.origin, self.next)
    }
}
