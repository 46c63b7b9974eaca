//! 连续帧段的 RAII 封装

use super::Coremap;
use crate::address::{Paddr, page_size};

/// 一段连续的已分配物理帧。
///
/// 实现了 RAII 模式：创建时整段清零，drop 时自动归还给 [`Coremap`]。
pub struct FrameRun<'a> {
    coremap: &'a Coremap,
    paddr: Paddr,
    pages: usize,
}

impl<'a> FrameRun<'a> {
    /// 接管一段刚分配的帧并清零。
    pub(super) fn new(coremap: &'a Coremap, paddr: Paddr, pages: usize) -> Self {
        let mut run = FrameRun {
            coremap,
            paddr,
            pages,
        };
        run.as_bytes_mut().fill(0);
        run
    }

    /// 首帧的物理地址
    pub fn paddr(&self) -> Paddr {
        self.paddr
    }

    /// 页数
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// 字节数
    pub fn len(&self) -> usize {
        self.pages * page_size()
    }

    /// 段是否为空（分配总是至少一页，因此恒为 false）
    pub fn is_empty(&self) -> bool {
        self.pages == 0
    }

    /// 通过直接映射读取整段内容
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: 整段帧由本对象独占，且位于直接映射区内
        unsafe {
            core::slice::from_raw_parts(self.paddr.to_kvaddr().as_mut_ptr::<u8>(), self.len())
        }
    }

    /// 通过直接映射写入整段内容
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: 同 as_bytes，且 &mut self 保证了唯一访问
        unsafe {
            core::slice::from_raw_parts_mut(self.paddr.to_kvaddr().as_mut_ptr::<u8>(), self.len())
        }
    }

    /// 用 `other` 的内容覆盖本段，两段长度必须相同
    pub fn copy_from(&mut self, other: &FrameRun<'_>) {
        assert_eq!(self.pages, other.pages, "copy_from: run length mismatch");
        self.as_bytes_mut().copy_from_slice(other.as_bytes());
    }
}

impl core::fmt::Debug for FrameRun<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameRun")
            .field("paddr", &self.paddr)
            .field("pages", &self.pages)
            .finish()
    }
}

impl Drop for FrameRun<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.coremap.free_pages(self.paddr) {
            log::error!("coremap: failed to release run at {:?}: {}", self.paddr, e);
        }
    }
}
