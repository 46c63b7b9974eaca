//! 集成测试公用环境：注册架构钩子，提供带模拟 RAM 的机器和断言中断状态的 TLB。

#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Once;

use test_support::mock::ram::MockRam;
use vm::{ArchVmOps, Coremap, Paddr, RamRange, Tlb, TlbEntry, VmConfig};

static INIT: Once = Once::new();

thread_local! {
    /// 当前线程"CPU"上的中断是否开启
    static INTR_ENABLED: Cell<bool> = const { Cell::new(true) };
}

struct TestArch;

impl sync::ArchOps for TestArch {
    unsafe fn disable_interrupts(&self) -> usize {
        INTR_ENABLED.with(|e| e.replace(false)) as usize
    }

    unsafe fn restore_interrupts(&self, saved: usize) {
        INTR_ENABLED.with(|e| e.set(saved != 0));
    }

    fn interrupts_enabled(&self, saved: usize) -> bool {
        saved != 0
    }
}

impl ArchVmOps for TestArch {
    fn vaddr_to_paddr(&self, vaddr: usize) -> usize {
        vaddr
    }

    fn paddr_to_vaddr(&self, paddr: usize) -> usize {
        paddr
    }

    fn num_cpus(&self) -> usize {
        4
    }
}

struct TestConfig;

impl VmConfig for TestConfig {
    fn page_size(&self) -> usize {
        4096
    }

    fn user_stack_top(&self) -> usize {
        0x8000_0000
    }

    fn stack_pages(&self) -> usize {
        12
    }
}

static TEST_ARCH: TestArch = TestArch;
static TEST_CONFIG: TestConfig = TestConfig;

pub fn init_once() {
    INIT.call_once(|| unsafe {
        sync::register_arch_ops(&TEST_ARCH);
        vm::register_arch_ops(&TEST_ARCH);
        vm::register_config(&TEST_CONFIG);
    });
}

/// 当前线程上中断是否开启
pub fn interrupts_enabled() -> bool {
    INTR_ENABLED.with(Cell::get)
}

/// 带模拟 RAM 的机器，coremap 先于 ram 被 drop
pub struct Machine {
    pub coremap: Coremap,
    ram: MockRam,
}

impl Machine {
    pub fn booted(pages: usize) -> Self {
        init_once();
        let ram = MockRam::new(pages);
        let range = RamRange::new(Paddr::new(ram.start()), Paddr::new(ram.end()));
        let coremap = unsafe { Coremap::new(range) };
        coremap.bootstrap().unwrap();
        Self { coremap, ram }
    }

    pub fn ram(&self) -> RamRange {
        RamRange::new(Paddr::new(self.ram.start()), Paddr::new(self.ram.end()))
    }
}

/// 每次改写都检查本地中断已被屏蔽的 TLB
pub struct CheckedTlb {
    pub entries: Vec<TlbEntry>,
}

impl CheckedTlb {
    pub fn new(size: usize) -> Self {
        init_once();
        Self {
            entries: (0..size).map(TlbEntry::invalid).collect(),
        }
    }

    pub fn valid(&self) -> Vec<TlbEntry> {
        self.entries.iter().copied().filter(TlbEntry::is_valid).collect()
    }
}

impl Tlb for CheckedTlb {
    fn size(&self) -> usize {
        self.entries.len()
    }

    fn read(&self, index: usize) -> TlbEntry {
        self.entries[index]
    }

    fn write(&mut self, index: usize, entry: TlbEntry) {
        assert!(!interrupts_enabled(), "TLB written with interrupts enabled");
        self.entries[index] = entry;
    }

    fn write_random(&mut self, entry: TlbEntry) {
        assert!(!interrupts_enabled(), "TLB written with interrupts enabled");
        let index = entry.vpage.as_usize() / 4096 % self.entries.len();
        self.entries[index] = entry;
    }
}
