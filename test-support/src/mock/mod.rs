//! Mock 实现模块

pub mod arch;
pub mod ram;
pub mod tlb;
pub mod vm;
