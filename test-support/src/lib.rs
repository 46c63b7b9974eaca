//! 测试支持 crate
//!
//! 提供各 crate 单元测试使用的 Mock 实现：中断状态、直接映射、布局配置、
//! 模拟物理内存和软件 TLB。

#![no_std]

extern crate alloc;

pub mod mock;
