//! 软件 TLB
//!
//! 以 MIPS 风格的 (EntryHi, EntryLo) 原始字保存条目。
//! "随机"替换使用确定性的轮转游标，便于测试断言被替换的槽位。

use alloc::vec;
use alloc::vec::Vec;

/// 软件模拟的 TLB
pub struct MockTlb {
    /// 每个槽位的 (EntryHi, EntryLo)，全零表示无效
    pub slots: Vec<(usize, usize)>,
    /// 下一次随机写入的槽位
    pub next_random: usize,
    /// 随机写入次数
    pub random_writes: usize,
    /// 按槽位写入次数
    pub indexed_writes: usize,
}

impl MockTlb {
    /// 创建一个 `size` 槽的空 TLB
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![(0, 0); size],
            next_random: 0,
            random_writes: 0,
            indexed_writes: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn read(&self, index: usize) -> (usize, usize) {
        self.slots[index]
    }

    pub fn write(&mut self, index: usize, ehi: usize, elo: usize) {
        self.slots[index] = (ehi, elo);
        self.indexed_writes += 1;
    }

    /// 写入"随机"槽位，即轮转游标指向的槽位
    pub fn write_random(&mut self, ehi: usize, elo: usize) {
        let index = self.next_random % self.slots.len();
        self.slots[index] = (ehi, elo);
        self.next_random = index + 1;
        self.random_writes += 1;
    }
}
