//! 地址空间描述符
//!
//! 每个进程一个 [`AddrSpace`]，由三段固定的窗口组成：
//!
//! - 区域 1、区域 2：由加载器通过 [`AddrSpace::define_region`] 声明的代码/数据区域
//! - 栈：`[user_stack_top - stack_pages * PAGE_SIZE, user_stack_top)`，大小固定，与进程实际用量无关
//!
//! 每个窗口绑定一个 [`FrameRun`]，在描述符销毁时自动归还。
//!
//! # 生命周期
//!
//! ```text
//! new ─► define_region ×2 ─► prepare_load ─► (加载器写入内容) ─► complete_load
//!     ─► define_stack ─► activate / deactivate ... ─► destroy
//! ```

use crate::address::{Paddr, Vaddr, page_size};
use crate::coremap::{Coremap, FrameRun};
use crate::error::{VmError, VmFailure, VmFatal, VmResult};
use crate::tlb::{Tlb, TlbEntry};
use crate::vm_config;
use bitflags::bitflags;
use sync::IntrGuard;

bitflags! {
    /// 区域访问权限
    ///
    /// 仅为接口兼容而接受，不产生任何效果：所有区域在硬件层面都以可读写方式映射。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionPerms: u32 {
        /// 可读
        const READ = 1 << 2;
        /// 可写
        const WRITE = 1 << 1;
        /// 可执行
        const EXEC = 1 << 0;
    }
}

/// 一段按页对齐的虚拟地址窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    vbase: Vaddr,
    npages: usize,
}

impl Region {
    /// 以页对齐的基址和页数创建窗口，调用者保证 `vtop` 不溢出
    pub(crate) fn new(vbase: Vaddr, npages: usize) -> Self {
        Self { vbase, npages }
    }

    /// 虚拟基址
    pub fn vbase(&self) -> Vaddr {
        self.vbase
    }

    /// 页数
    pub fn npages(&self) -> usize {
        self.npages
    }

    /// 窗口结束地址（不包含）
    pub fn vtop(&self) -> Vaddr {
        self.vbase + self.npages * page_size()
    }

    /// 窗口是否包含 `vaddr`
    pub fn contains(&self, vaddr: Vaddr) -> bool {
        vaddr >= self.vbase && (vaddr - self.vbase) / page_size() < self.npages
    }
}

/// 解析命中的窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// 区域 1
    Region1,
    /// 区域 2
    Region2,
    /// 栈
    Stack,
}

/// 一次地址解析的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    /// 对应的物理地址
    pub paddr: Paddr,
    /// 命中的窗口
    pub window: Window,
}

/// 地址空间描述符
pub struct AddrSpace<'a> {
    coremap: &'a Coremap,
    region1: Option<Region>,
    region2: Option<Region>,
    run1: Option<FrameRun<'a>>,
    run2: Option<FrameRun<'a>>,
    stack_run: Option<FrameRun<'a>>,
    image_loaded: bool,
}

impl<'a> AddrSpace<'a> {
    /// 创建一个空的地址空间：没有区域，没有物理绑定，映像未加载
    pub fn new(coremap: &'a Coremap) -> Self {
        Self {
            coremap,
            region1: None,
            region2: None,
            run1: None,
            run2: None,
            stack_run: None,
            image_loaded: false,
        }
    }

    /// 声明一个区域。
    ///
    /// `[vaddr, vaddr + size)` 会被扩展到页边界。依次填入区域 1、区域 2，
    /// 第三次声明返回 [`VmError::TooManyRegions`]。权限被忽略。
    ///
    /// 区域大小为 0，或者扩展后的结束地址超出地址空间顶端时返回
    /// [`VmError::InvalidArgument`]。
    pub fn define_region(
        &mut self,
        vaddr: Vaddr,
        size: usize,
        _perms: RegionPerms,
    ) -> VmResult<()> {
        if size == 0 {
            return Err(VmError::InvalidArgument);
        }
        let end = vaddr
            .checked_add(size)
            .and_then(Vaddr::checked_page_ceil)
            .ok_or(VmError::InvalidArgument)?;
        let vbase = vaddr.page_floor();
        let npages = (end - vbase) / page_size();
        let region = Region::new(vbase, npages);

        if self.region1.is_none() {
            self.region1 = Some(region);
            return Ok(());
        }
        if self.region2.is_none() {
            self.region2 = Some(region);
            return Ok(());
        }

        log::warn!("vm: too many regions, rejecting {:?}", region);
        Err(VmError::TooManyRegions)
    }

    /// 为两个区域和栈分配物理帧并清零。
    ///
    /// 任何一次分配失败都会直接返回，已经分配的帧段保留在描述符中，
    /// 由调用者销毁描述符时统一归还。
    pub fn prepare_load(&mut self) -> Result<(), VmFailure> {
        if self.run1.is_some() || self.run2.is_some() || self.stack_run.is_some() {
            return Err(VmFatal::AlreadyPrepared.into());
        }
        let (Some(region1), Some(region2)) = (self.region1, self.region2) else {
            return Err(VmFatal::RegionNotDefined.into());
        };

        self.run1 = Some(self.coremap.alloc_run(region1.npages())?);
        self.run2 = Some(self.coremap.alloc_run(region2.npages())?);
        self.stack_run = Some(self.coremap.alloc_run(vm_config().stack_pages())?);
        Ok(())
    }

    /// 标记映像已由加载器写入完毕。此后区域 1 的 TLB 条目以只读方式安装。
    pub fn complete_load(&mut self) {
        self.image_loaded = true;
    }

    /// 返回新程序的初始栈指针
    pub fn define_stack(&self) -> Result<Vaddr, VmFatal> {
        if self.stack_run.is_none() {
            return Err(VmFatal::UnboundAddrSpace);
        }
        Ok(Vaddr::new(vm_config().user_stack_top()))
    }

    /// 切换到此地址空间时调用：屏蔽本地中断并失效全部 TLB 条目
    pub fn activate<T: Tlb + ?Sized>(&self, tlb: &mut T) {
        let _guard = IntrGuard::new();
        for i in 0..tlb.size() {
            tlb.write(i, TlbEntry::invalid(i));
        }
    }

    /// 切换离开此地址空间时调用。
    ///
    /// 什么也不做：残留的条目会在下一次 [`AddrSpace::activate`] 时被失效。
    pub fn deactivate(&self) {}

    /// 复制出一个几何形状相同、内容逐字节相同、物理帧互不重叠的地址空间。
    ///
    /// 映像加载标记不会被复制。新地址空间无法获得物理帧时先销毁再返回错误。
    pub fn copy(&self) -> Result<AddrSpace<'a>, VmFailure> {
        let (Some(src1), Some(src2), Some(src_stack)) =
            (self.run1.as_ref(), self.run2.as_ref(), self.stack_run.as_ref())
        else {
            return Err(VmFatal::UnboundAddrSpace.into());
        };

        let mut new = AddrSpace::new(self.coremap);
        new.region1 = self.region1;
        new.region2 = self.region2;
        if let Err(e) = new.prepare_load() {
            new.destroy();
            return Err(e);
        }

        // prepare_load 成功后三段必然都已绑定
        if let (Some(dst1), Some(dst2), Some(dst_stack)) =
            (new.run1.as_mut(), new.run2.as_mut(), new.stack_run.as_mut())
        {
            dst1.copy_from(src1);
            dst2.copy_from(src2);
            dst_stack.copy_from(src_stack);
        }
        Ok(new)
    }

    /// 归还全部物理帧并销毁描述符。不得销毁当前正在使用的地址空间。
    pub fn destroy(self) {
        log::debug!(
            "vm: destroying address space {:?} / {:?}",
            self.region1,
            self.region2
        );
    }

    /// 区域 1
    pub fn region1(&self) -> Option<Region> {
        self.region1
    }

    /// 区域 2
    pub fn region2(&self) -> Option<Region> {
        self.region2
    }

    /// 固定的栈窗口
    pub fn stack_region(&self) -> Region {
        let npages = vm_config().stack_pages();
        let top = Vaddr::new(vm_config().user_stack_top());
        Region::new(top - npages * page_size(), npages)
    }

    /// 区域 1 的物理基址
    pub fn pbase1(&self) -> Option<Paddr> {
        self.run1.as_ref().map(FrameRun::paddr)
    }

    /// 区域 2 的物理基址
    pub fn pbase2(&self) -> Option<Paddr> {
        self.run2.as_ref().map(FrameRun::paddr)
    }

    /// 栈的物理基址
    pub fn stack_pbase(&self) -> Option<Paddr> {
        self.stack_run.as_ref().map(FrameRun::paddr)
    }

    /// 映像是否已加载
    pub fn image_loaded(&self) -> bool {
        self.image_loaded
    }

    /// 检查三个窗口都已绑定物理帧且基址页对齐
    pub fn validate(&self) -> Result<(), VmFatal> {
        let (Some(r1), Some(r2), Some(p1), Some(p2), Some(ps)) = (
            self.region1,
            self.region2,
            self.pbase1(),
            self.pbase2(),
            self.stack_pbase(),
        ) else {
            return Err(VmFatal::UnboundAddrSpace);
        };
        if r1.npages() == 0 || r2.npages() == 0 {
            return Err(VmFatal::UnboundAddrSpace);
        }

        let aligned = r1.vbase().is_page_aligned()
            && r2.vbase().is_page_aligned()
            && p1.is_page_aligned()
            && p2.is_page_aligned()
            && ps.is_page_aligned();
        if !aligned {
            return Err(VmFatal::MisalignedBinding);
        }
        Ok(())
    }

    /// 依次在区域 1、区域 2、栈中查找 `vaddr`，按固定偏移换算物理地址
    pub fn resolve(&self, vaddr: Vaddr) -> Option<Translation> {
        let windows = [
            (self.region1, self.pbase1(), Window::Region1),
            (self.region2, self.pbase2(), Window::Region2),
            (Some(self.stack_region()), self.stack_pbase(), Window::Stack),
        ];
        windows.into_iter().find_map(|(region, pbase, window)| {
            let (region, pbase) = (region?, pbase?);
            region.contains(vaddr).then(|| Translation {
                paddr: pbase + (vaddr - region.vbase()),
                window,
            })
        })
    }

    /// 把 `bytes` 写入用户地址 `vaddr` 处（可跨页、跨窗口）
    pub fn write_bytes(&mut self, vaddr: Vaddr, bytes: &[u8]) -> VmResult<()> {
        let mut written = 0usize;
        while written < bytes.len() {
            let cur = vaddr.checked_add(written).ok_or(VmError::BadAddress)?;
            let t = self.resolve(cur).ok_or(VmError::BadAddress)?;
            let take = core::cmp::min(bytes.len() - written, page_size() - cur.page_offset());
            let dst = t.paddr.to_kvaddr().as_mut_ptr::<u8>();
            // SAFETY: 目标位于本地址空间独占的帧段内，且不跨页
            unsafe { core::ptr::copy_nonoverlapping(bytes[written..].as_ptr(), dst, take) };
            written += take;
        }
        Ok(())
    }

    /// 从用户地址 `vaddr` 处读取 `out.len()` 字节（可跨页、跨窗口）
    pub fn read_bytes(&self, vaddr: Vaddr, out: &mut [u8]) -> VmResult<()> {
        let mut read = 0usize;
        while read < out.len() {
            let cur = vaddr.checked_add(read).ok_or(VmError::BadAddress)?;
            let t = self.resolve(cur).ok_or(VmError::BadAddress)?;
            let take = core::cmp::min(out.len() - read, page_size() - cur.page_offset());
            let src = t.paddr.to_kvaddr().as_mut_ptr::<u8>() as *const u8;
            // SAFETY: 同 write_bytes
            unsafe { core::ptr::copy_nonoverlapping(src, out[read..].as_mut_ptr(), take) };
            read += take;
        }
        Ok(())
    }
}
