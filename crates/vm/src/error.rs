//! 虚拟内存错误类型
//!
//! 错误分为两类：
//!
//! - [`VmError`]：可恢复错误（内存耗尽、非法访问、参数错误），
//!   可通过 [`VmError::to_errno()`] 转换为系统调用错误码交给出错的进程。
//! - [`VmFatal`]：不可恢复错误，表示内核自身的缺陷或不受支持的配置，调用者应当终止内核。
//!
//! 两类都可能出现的操作返回 [`VmFailure`]。

use crate::address::Paddr;

/// 可恢复的虚拟内存错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// 没有足够长的连续空闲帧 (-ENOMEM)
    #[error("out of physical memory")]
    OutOfMemory,
    /// 访问的地址不在任何区域内 (-EFAULT)
    #[error("bad address")]
    BadAddress,
    /// 无效参数或无效的缺页类型 (-EINVAL)
    #[error("invalid argument")]
    InvalidArgument,
    /// 已经定义了两个区域 (-ENOSYS)
    #[error("too many regions")]
    TooManyRegions,
}

impl VmError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            VmError::OutOfMemory => -12,
            VmError::BadAddress => -14,
            VmError::InvalidArgument => -22,
            VmError::TooManyRegions => -38,
        }
    }
}

/// 不可恢复的虚拟内存错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmFatal {
    /// 帧表初始化了两次
    #[error("coremap already bootstrapped")]
    AlreadyBootstrapped,
    /// 可用内存连帧表自身都放不下
    #[error("RAM too small for the coremap")]
    RamTooSmall,
    /// 释放的地址不是某段已分配帧的首帧
    #[error("{0:?} is not the head of an allocated run")]
    NotRunHead(Paddr),
    /// 释放的地址不归帧表管理
    #[error("{0:?} is not managed by the coremap")]
    UnmanagedAddress(Paddr),
    /// 地址空间已经绑定过物理帧
    #[error("address space already has physical memory")]
    AlreadyPrepared,
    /// 地址空间缺少区域定义
    #[error("address space has fewer than two regions")]
    RegionNotDefined,
    /// 地址空间尚未完整绑定物理帧
    #[error("address space is not fully bound")]
    UnboundAddrSpace,
    /// 区域的虚拟或物理基址未页对齐
    #[error("address space binding is not page aligned")]
    MisalignedBinding,
    /// 缺页时没有当前进程或地址空间
    #[error("fault with no current address space")]
    NoAddrSpace,
    /// 没有可用的 TLB 槽位
    #[error("ran out of TLB entries")]
    TlbExhausted,
    /// 请求了跨核 TLB 失效
    #[error("TLB shootdown is not supported")]
    ShootdownUnsupported,
}

/// 可恢复或不可恢复的虚拟内存错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmFailure {
    /// 可恢复错误
    #[error(transparent)]
    Error(#[from] VmError),
    /// 不可恢复错误
    #[error("fatal: {0}")]
    Fatal(#[from] VmFatal),
}

impl VmFailure {
    /// 是否是不可恢复错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, VmFailure::Fatal(_))
    }

    /// 可恢复错误部分
    pub fn error(&self) -> Option<VmError> {
        match self {
            VmFailure::Error(e) => Some(*e),
            VmFailure::Fatal(_) => None,
        }
    }
}

/// 只会产生可恢复错误的操作的结果类型
pub type VmResult<T> = Result<T, VmError>;
