//! 虚拟内存子系统
//!
//! 采用"段式"模型：每个地址空间最多两个代码/数据区域加一个固定大小的栈区域，
//! 每个区域在地址空间的整个生命周期内绑定一段连续的物理帧。
//! 不支持按需调页、换出和写时复制。
//!
//! # 组成
//!
//! - [`coremap`]：物理帧表（coremap）、启动期的窃取分配器和 RAII 帧段 [`FrameRun`]
//! - [`addrspace`]：地址空间描述符 [`AddrSpace`]
//! - [`tlb`]：TLB 条目和硬件访问接口 [`Tlb`]
//! - [`fault`]：TLB 缺失处理 [`vm_fault`]
//!
//! # 架构解耦
//!
//! 通过 trait 抽象与架构特定组件解耦：
//! - [`ArchVmOps`]: 直接映射区的地址转换
//! - [`VmConfig`]: 页大小、用户栈等布局常量
//! - [`sync::ArchOps`]: 中断屏蔽
//!
//! 使用前必须调用 [`register_arch_ops`] 和 [`register_config`] 注册实现。

#![no_std]

extern crate alloc;

mod arch_ops;
mod config;
mod error;

pub mod address;
pub mod addrspace;
pub mod coremap;
pub mod fault;
pub mod tlb;

#[cfg(test)]
mod test_utils;

pub use arch_ops::{ArchVmOps, arch_ops, register_arch_ops};
pub use config::{VmConfig, register_config, vm_config};
pub use error::{VmError, VmFailure, VmFatal, VmResult};

pub use address::{Paddr, RamRange, Vaddr};
pub use addrspace::{AddrSpace, Region, RegionPerms, Translation, Window};
pub use coremap::{Coremap, Frame, FrameRun, FrameState, FrameStats};
pub use fault::{FaultType, first_region_readonly_after_load, vm_fault};
pub use tlb::{Tlb, TlbEntry, TlbFlags, TlbShootdown, vm_tlbshootdown, vm_tlbshootdown_all};
