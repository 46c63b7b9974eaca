//! TLB 缺失处理
//!
//! 陷阱分发器在每次 TLB 缺失或保护违例时调用 [`vm_fault`]。处理过程不保存任何跨调用状态：
//!
//! 1. 解码缺页类型，只接受读、写缺页
//! 2. 要求存在当前地址空间，并且它已经完整绑定物理帧
//! 3. 依次在区域 1、区域 2、栈中解析缺页地址
//! 4. 屏蔽本地中断，优先复用第一个无效槽位，否则随机替换
//!
//! 所有区域在硬件层面都是可写的，唯一的例外由 [`first_region_readonly_after_load`] 决定。

use crate::address::Vaddr;
use crate::addrspace::{AddrSpace, Translation, Window};
use crate::error::{VmError, VmFailure, VmFatal};
use crate::tlb::{Tlb, TlbEntry, TlbFlags};
use sync::IntrGuard;

/// 缺页类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    /// 读缺失
    Read,
    /// 写缺失
    Write,
    /// 写只读页
    ReadOnly,
}

impl FaultType {
    /// 从陷阱分发器传来的编号解码，未知编号返回 `None`
    pub fn from_raw(raw: usize) -> Option<Self> {
        match raw {
            0 => Some(FaultType::Read),
            1 => Some(FaultType::Write),
            2 => Some(FaultType::ReadOnly),
            _ => None,
        }
    }
}

/// 映像加载完成后，区域 1 以只读方式安装。
///
/// 这是对"代码段加载后只读"的近似，不看区域是否真的是代码。
pub fn first_region_readonly_after_load(space: &AddrSpace<'_>, translation: &Translation) -> bool {
    translation.window == Window::Region1 && space.image_loaded()
}

/// 处理一次 TLB 缺失。
///
/// `space` 是当前进程的地址空间，没有当前进程时传 `None`。
///
/// # Errors
/// - 写只读页或未知缺页类型：[`VmError::InvalidArgument`]
/// - 地址不在任何窗口内：[`VmError::BadAddress`]
/// - 没有地址空间、地址空间未完整绑定、TLB 没有槽位：[`VmFatal`]
pub fn vm_fault<T: Tlb + ?Sized>(
    tlb: &mut T,
    space: Option<&AddrSpace<'_>>,
    fault_type: usize,
    fault_addr: Vaddr,
) -> Result<(), VmFailure> {
    let vpage = fault_addr.page_floor();

    match FaultType::from_raw(fault_type) {
        Some(FaultType::Read | FaultType::Write) => {}
        // 所有页都以可写方式安装，不应出现写只读页
        Some(FaultType::ReadOnly) | None => return Err(VmError::InvalidArgument.into()),
    }

    let space = space.ok_or(VmFatal::NoAddrSpace)?;
    space.validate()?;

    let translation = space.resolve(vpage).ok_or(VmError::BadAddress)?;
    let flags = if first_region_readonly_after_load(space, &translation) {
        TlbFlags::VALID
    } else {
        TlbFlags::VALID | TlbFlags::DIRTY
    };
    let entry = TlbEntry::new(vpage, translation.paddr, flags);

    let _guard = IntrGuard::new();
    install(tlb, entry)?;
    log::debug!(
        "vm: fault at {:?} ({:?}) -> {:?} {:?}",
        fault_addr,
        translation.window,
        translation.paddr,
        flags
    );
    Ok(())
}

/// 写入第一个无效槽位，全部有效时随机替换
fn install<T: Tlb + ?Sized>(tlb: &mut T, entry: TlbEntry) -> Result<(), VmFatal> {
    let size = tlb.size();
    if size == 0 {
        return Err(VmFatal::TlbExhausted);
    }
    match (0..size).find(|&i| !tlb.read(i).is_valid()) {
        Some(i) => tlb.write(i, entry),
        None => tlb.write_random(entry),
    }
    Ok(())
}
