//! 模拟物理内存
//!
//! 在宿主堆上申请一块按页对齐的内存充当"物理内存"。
//! 配合恒等映射使用，帧表可以像在真机上一样直接写入这块内存。

use alloc::alloc::{Layout, alloc_zeroed, dealloc};

/// 模拟页大小，与 [`MockVmConfig`](super::vm::MockVmConfig) 保持一致
pub const MOCK_PAGE_SIZE: usize = 4096;

/// 一段按页对齐、初始为零的模拟物理内存
pub struct MockRam {
    base: *mut u8,
    layout: Layout,
}

impl MockRam {
    /// 申请 `pages` 页模拟内存
    ///
    /// # Panics
    /// 宿主内存不足时 panic
    pub fn new(pages: usize) -> Self {
        assert!(pages > 0, "MockRam needs at least one page");
        let layout = Layout::from_size_align(pages * MOCK_PAGE_SIZE, MOCK_PAGE_SIZE)
            .expect("invalid MockRam layout");
        // SAFETY: layout 大小非零
        let base = unsafe { alloc_zeroed(layout) };
        assert!(!base.is_null(), "MockRam allocation failed");
        Self { base, layout }
    }

    /// 起始地址（恒等映射下即物理地址）
    pub fn start(&self) -> usize {
        self.base as usize
    }

    /// 结束地址（不包含）
    pub fn end(&self) -> usize {
        self.start() + self.layout.size()
    }
}

impl Drop for MockRam {
    fn drop(&mut self) {
        // SAFETY: base 由同一个 layout 申请
        unsafe { dealloc(self.base, self.layout) };
    }
}

// SAFETY: MockRam 只是一段独占的堆内存
unsafe impl Send for MockRam {}
unsafe impl Sync for MockRam {}
