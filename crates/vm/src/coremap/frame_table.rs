//! 帧表
//!
//! 帧表按物理地址顺序为每个物理帧保存一条 [`Frame`] 记录，
//! 记录数组本身就放在可用 RAM 的最低端，覆盖它的那些帧被永久标记为 [`FrameState::Reserved`]。
//!
//! 每条记录用 [`FrameState`] 显式描述帧在分配段中的角色：
//! 段首帧携带整段的页数，段内其余帧只标记为段体。
//! 释放时只接受段首帧的地址，段体或空闲帧的地址会被拒绝。

use crate::address::{Paddr, RamRange, page_size};
use crate::error::{VmError, VmFatal, VmResult};

/// 物理帧在分配中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// 空闲
    Free,
    /// 存放帧表自身，永不释放
    Reserved,
    /// 一段已分配帧的首帧，`pages` 为整段页数（至少为 1）
    RunHead {
        /// 整段页数
        pages: usize,
    },
    /// 一段已分配帧中首帧之后的帧
    RunBody,
}

/// 一个物理帧的记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    paddr: Paddr,
    state: FrameState,
}

impl Frame {
    /// 帧的物理地址
    pub fn paddr(&self) -> Paddr {
        self.paddr
    }

    /// 帧的状态
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// 是否已被占用（包括帧表保留帧）
    pub fn in_use(&self) -> bool {
        self.state != FrameState::Free
    }

    /// 是否属于某个已分配段（包括段首）
    pub fn part_of_run(&self) -> bool {
        matches!(self.state, FrameState::RunHead { .. } | FrameState::RunBody)
    }

    /// 段首帧返回"段长 - 1"，其余帧返回 0
    pub fn run_head_length(&self) -> usize {
        match self.state {
            FrameState::RunHead { pages } => pages - 1,
            _ => 0,
        }
    }
}

/// 帧使用情况统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// 帧表覆盖的总帧数
    pub total: usize,
    /// 帧表自身占用的帧数
    pub reserved: usize,
    /// 已分配出去的帧数（不含保留帧）
    pub used: usize,
    /// 空闲帧数
    pub free: usize,
}

pub(super) struct FrameTable {
    frames: &'static mut [Frame],
    /// 第一个完全空闲的帧，分配从这里开始查找
    search_start: usize,
    used: usize,
}

impl FrameTable {
    /// 在 `ram` 的低端建立帧表。
    ///
    /// # Safety
    /// `ram` 必须是独占的、可通过直接映射访问的物理内存，
    /// 并且在帧表的整个生命周期内保持有效。
    pub(super) unsafe fn build(ram: RamRange) -> Result<Self, VmFatal> {
        let page = page_size();
        let low = ram.start.page_ceil();
        let high = ram.end.page_floor();
        if high <= low {
            return Err(VmFatal::RamTooSmall);
        }

        let count = (high - low) / page;
        let table_bytes = count * core::mem::size_of::<Frame>();
        let first_free = (low + table_bytes).page_ceil();
        let reserved = (first_free - low) / page;
        if reserved >= count {
            return Err(VmFatal::RamTooSmall);
        }

        let base = low.to_kvaddr().as_mut_ptr::<Frame>();
        debug_assert!(base.is_aligned());
        for i in 0..count {
            let state = if i < reserved {
                FrameState::Reserved
            } else {
                FrameState::Free
            };
            // SAFETY: [low, low + table_bytes) 位于 ram 内，且调用者保证独占
            unsafe {
                base.add(i).write(Frame {
                    paddr: low + i * page,
                    state,
                })
            };
        }
        // SAFETY: 上面已经初始化了全部 count 条记录
        let frames = unsafe { core::slice::from_raw_parts_mut(base, count) };

        Ok(Self {
            frames,
            search_start: reserved,
            used: 0,
        })
    }

    /// 首次适配：按物理地址顺序查找第一段 `npages` 个连续空闲帧
    pub(super) fn allocate(&mut self, npages: usize) -> VmResult<Paddr> {
        if npages == 0 {
            return Err(VmError::InvalidArgument);
        }
        if npages > self.free_frames() {
            return Err(VmError::OutOfMemory);
        }

        let mut run_start = self.search_start;
        let mut run_len = 0;
        for idx in self.search_start..self.frames.len() {
            if self.frames[idx].in_use() {
                run_len = 0;
                run_start = idx + 1;
                continue;
            }
            run_len += 1;
            if run_len == npages {
                self.commit(run_start, npages);
                return Ok(self.frames[run_start].paddr);
            }
        }

        Err(VmError::OutOfMemory)
    }

    fn commit(&mut self, start: usize, npages: usize) {
        self.frames[start].state = FrameState::RunHead { pages: npages };
        for frame in &mut self.frames[start + 1..start + npages] {
            frame.state = FrameState::RunBody;
        }
        self.used += npages;
    }

    /// 释放以 `paddr` 为首帧的整段，返回释放的页数
    pub(super) fn free(&mut self, paddr: Paddr) -> Result<usize, VmFatal> {
        let idx = self
            .index_of(paddr)
            .ok_or(VmFatal::UnmanagedAddress(paddr))?;
        let FrameState::RunHead { pages } = self.frames[idx].state else {
            return Err(VmFatal::NotRunHead(paddr));
        };

        for frame in &mut self.frames[idx..idx + pages] {
            debug_assert!(frame.part_of_run(), "free: run overlaps an unowned frame");
            frame.state = FrameState::Free;
        }
        self.used -= pages;
        Ok(pages)
    }

    /// 管理的物理地址范围
    pub(super) fn managed(&self) -> RamRange {
        let start = self.frames[0].paddr;
        RamRange::new(start, start + self.frames.len() * page_size())
    }

    pub(super) fn frame(&self, paddr: Paddr) -> Option<Frame> {
        self.index_of(paddr).map(|idx| self.frames[idx])
    }

    fn index_of(&self, paddr: Paddr) -> Option<usize> {
        let base = self.frames[0].paddr;
        if paddr < base || !paddr.is_page_aligned() {
            return None;
        }
        let idx = (paddr - base) / page_size();
        (idx < self.frames.len()).then_some(idx)
    }

    fn free_frames(&self) -> usize {
        self.frames.len() - self.search_start - self.used
    }

    pub(super) fn stats(&self) -> FrameStats {
        FrameStats {
            total: self.frames.len(),
            reserved: self.search_start,
            used: self.used,
            free: self.free_frames(),
        }
    }
}
