//! 单元测试公用工具

extern crate test_support;

use crate::address::{Paddr, RamRange};
use crate::coremap::Coremap;
use core::sync::atomic::{AtomicUsize, Ordering};
use sync::ArchOps;
use test_support::mock::arch::MOCK_ARCH_OPS;
use test_support::mock::ram::MockRam;

/// 把 sync 的中断钩子转发给 test-support 的屏蔽深度计数
struct MockIntr;

impl ArchOps for MockIntr {
    unsafe fn disable_interrupts(&self) -> usize {
        MOCK_ARCH_OPS.disable()
    }

    unsafe fn restore_interrupts(&self, saved: usize) {
        MOCK_ARCH_OPS.restore(saved)
    }

    fn interrupts_enabled(&self, saved: usize) -> bool {
        saved != 0
    }
}

static MOCK_INTR: MockIntr = MockIntr;
// 0 = uninit, 1 = initializing, 2 = ready
static SYNC_INIT: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn init_sync_arch_ops() {
    match SYNC_INIT.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            // Safety: tests use a single global mock ArchOps.
            unsafe { sync::register_arch_ops(&MOCK_INTR) };
            SYNC_INIT.store(2, Ordering::Release);
        }
        Err(_) => {
            while SYNC_INIT.load(Ordering::Acquire) != 2 {
                core::hint::spin_loop();
            }
        }
    }
}

/// 一台带有模拟 RAM 的测试机器
///
/// 字段顺序保证 coremap 先于 ram 被 drop。
pub(crate) struct TestMachine {
    pub(crate) coremap: Coremap,
    ram: MockRam,
}

impl TestMachine {
    /// 创建处于窃取阶段的机器
    pub(crate) fn new(pages: usize) -> Self {
        init_sync_arch_ops();
        let ram = MockRam::new(pages);
        let range = RamRange::new(Paddr::new(ram.start()), Paddr::new(ram.end()));
        // SAFETY: ram 由本结构体独占，并且比 coremap 活得久
        let coremap = unsafe { Coremap::new(range) };
        Self { coremap, ram }
    }

    /// 创建已经建立帧表的机器
    pub(crate) fn booted(pages: usize) -> Self {
        let m = Self::new(pages);
        m.coremap.bootstrap().unwrap();
        m
    }

    pub(crate) fn ram_start(&self) -> Paddr {
        Paddr::new(self.ram.start())
    }

    pub(crate) fn ram_end(&self) -> Paddr {
        Paddr::new(self.ram.end())
    }
}
