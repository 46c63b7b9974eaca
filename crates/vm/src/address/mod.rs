//! 地址模块
//!
//! 提供物理地址和虚拟地址的强类型封装，以及按页对齐的辅助操作。
//!
//! - [`Paddr`] - 物理地址
//! - [`Vaddr`] - 虚拟地址（用户地址或直接映射区的内核地址）
//! - [`RamRange`] - 一段可供分配的物理内存 `[start, end)`
//!
//! 页大小来自 [`vm_config`](crate::vm_config)，因此对齐操作都在运行时计算。

mod types;

pub use types::{Paddr, RamRange, Vaddr, page_size};
