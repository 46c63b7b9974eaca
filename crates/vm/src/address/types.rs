//! 地址类型

use core::fmt;
use core::ops::{Add, Sub};

/// 获取页大小
#[inline]
pub fn page_size() -> usize {
    crate::vm_config().page_size()
}

/// `impl_address!` 宏
/// ---------------------
/// 为地址 newtype 实现对齐操作、与 usize 的偏移运算和十六进制格式化。
macro_rules! impl_address {
    ($type:ident) => {
        impl $type {
            /// 从 usize 构造地址
            pub const fn new(value: usize) -> Self {
                Self(value)
            }

            /// 取出原始值
            pub const fn as_usize(self) -> usize {
                self.0
            }

            /// 向下对齐到页边界
            pub fn page_floor(self) -> Self {
                Self(self.0 & !(page_size() - 1))
            }

            /// 向上对齐到页边界
            pub fn page_ceil(self) -> Self {
                Self(self.0.next_multiple_of(page_size()))
            }

            /// 向上对齐到页边界，溢出时返回 `None`
            pub fn checked_page_ceil(self) -> Option<Self> {
                self.0.checked_next_multiple_of(page_size()).map(Self)
            }

            /// 页内偏移
            pub fn page_offset(self) -> usize {
                self.0 & (page_size() - 1)
            }

            /// 是否页对齐
            pub fn is_page_aligned(self) -> bool {
                self.page_offset() == 0
            }

            /// 加上 `offset` 字节，溢出时返回 `None`
            pub fn checked_add(self, offset: usize) -> Option<Self> {
                self.0.checked_add(offset).map(Self)
            }
        }

        impl Add<usize> for $type {
            type Output = Self;

            fn add(self, rhs: usize) -> Self {
                Self(self.0 + rhs)
            }
        }

        impl Sub<usize> for $type {
            type Output = Self;

            fn sub(self, rhs: usize) -> Self {
                Self(self.0 - rhs)
            }
        }

        /// 两个地址之间的字节距离
        impl Sub<$type> for $type {
            type Output = usize;

            fn sub(self, rhs: $type) -> usize {
                self.0 - rhs.0
            }
        }

        impl fmt::Debug for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($type), self.0)
            }
        }

        impl fmt::LowerHex for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

/// 物理地址
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Paddr(usize);
impl_address!(Paddr);

impl Paddr {
    /// 转换为直接映射区的内核虚拟地址
    pub fn to_kvaddr(self) -> Vaddr {
        Vaddr(crate::arch_ops().paddr_to_vaddr(self.0))
    }
}

/// 虚拟地址
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vaddr(usize);
impl_address!(Vaddr);

impl Vaddr {
    /// 将直接映射区的内核虚拟地址转换为物理地址
    pub fn kvaddr_to_paddr(self) -> Paddr {
        Paddr(crate::arch_ops().vaddr_to_paddr(self.0))
    }

    /// 作为内核可解引用的指针
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

/// 一段物理内存 `[start, end)`
///
/// 相当于启动时从固件/引导程序得到的可用 RAM 范围。
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RamRange {
    /// 第一个可用字节
    pub start: Paddr,
    /// 最后一个可用字节之后
    pub end: Paddr,
}

impl RamRange {
    /// 创建一个范围
    pub const fn new(start: Paddr, end: Paddr) -> Self {
        Self { start, end }
    }

    /// 范围的字节数
    pub fn len(&self) -> usize {
        self.end.as_usize().saturating_sub(self.start.as_usize())
    }

    /// 范围是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
