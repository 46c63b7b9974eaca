//! 地址空间的集成测试：加载器流程、进程复制和缺页处理。

mod common;

use common::{CheckedTlb, Machine, interrupts_enabled};
use vm::{AddrSpace, RegionPerms, Vaddr, VmError, VmFailure, vm_fault};

const TEXT: Vaddr = Vaddr::new(0x40_0000);
const DATA: Vaddr = Vaddr::new(0x41_2000);
const STACK_TOP: Vaddr = Vaddr::new(0x8000_0000);

const READ: usize = 0;
const WRITE: usize = 1;

/// 模拟加载器：定义区域、分配、写入映像、完成加载
fn load<'a>(m: &'a Machine, text: &[u8], data: &[u8]) -> (AddrSpace<'a>, Vaddr) {
    let mut space = AddrSpace::new(&m.coremap);
    space
        .define_region(TEXT, text.len(), RegionPerms::READ | RegionPerms::EXEC)
        .unwrap();
    space
        .define_region(DATA, data.len(), RegionPerms::READ | RegionPerms::WRITE)
        .unwrap();
    space.prepare_load().unwrap();
    space.write_bytes(TEXT, text).unwrap();
    space.write_bytes(DATA, data).unwrap();
    space.complete_load();
    let sp = space.define_stack().unwrap();
    (space, sp)
}

#[test]
fn test_loader_lifecycle() {
    let m = Machine::booted(128);
    let before = m.coremap.stats().unwrap();

    let text = vec![0x90u8; 5000];
    let (space, sp) = load(&m, &text, b"hello");
    assert_eq!(sp, STACK_TOP);
    assert!(space.image_loaded());
    assert_eq!(space.region1().unwrap().npages(), 2);
    assert_eq!(space.region2().unwrap().npages(), 1);

    let mut tlb = CheckedTlb::new(16);
    space.activate(&mut tlb);
    assert!(interrupts_enabled());

    vm_fault(&mut tlb, Some(&space), READ, TEXT + 4097).unwrap();
    vm_fault(&mut tlb, Some(&space), WRITE, DATA).unwrap();
    vm_fault(&mut tlb, Some(&space), WRITE, sp - 4).unwrap();
    assert!(interrupts_enabled());

    let valid = tlb.valid();
    assert_eq!(valid.len(), 3);
    assert!(!valid[0].is_writable());
    assert_eq!(valid[0].frame, space.pbase1().unwrap() + 4096);
    assert!(valid[1].is_writable() && valid[2].is_writable());

    assert_eq!(
        vm_fault(&mut tlb, Some(&space), READ, TEXT + 2 * 4096),
        Err(VmFailure::Error(VmError::BadAddress))
    );

    space.deactivate();
    space.destroy();
    assert_eq!(m.coremap.stats().unwrap(), before);
}

#[test]
fn test_copy_is_identical_and_disjoint() {
    let m = Machine::booted(256);
    let text: Vec<u8> = (0..3 * 4096u32).map(|i| (i * 7 % 256) as u8).collect();
    let (mut parent, sp) = load(&m, &text, b"parent data");
    parent.write_bytes(sp - 16, b"saved registers!").unwrap();

    let child = parent.copy().unwrap();
    let used = m.coremap.stats().unwrap().used;

    for (vaddr, len) in [(TEXT, 3 * 4096), (DATA, 4096), (sp - 12 * 4096, 12 * 4096)] {
        let mut a = vec![0u8; len];
        let mut b = vec![0u8; len];
        parent.read_bytes(vaddr, &mut a).unwrap();
        child.read_bytes(vaddr, &mut b).unwrap();
        assert_eq!(a, b);
    }

    let bases = |s: &AddrSpace<'_>| {
        [
            (s.pbase1().unwrap(), s.region1().unwrap().npages()),
            (s.pbase2().unwrap(), s.region2().unwrap().npages()),
            (s.stack_pbase().unwrap(), 12),
        ]
    };
    for (pa, na) in bases(&parent) {
        for (pb, nb) in bases(&child) {
            let disjoint = pa + na * 4096 <= pb || pb + nb * 4096 <= pa;
            assert!(disjoint, "copy shares frames with its parent");
        }
    }

    // 子进程的修改不影响父进程
    let mut child = child;
    child.write_bytes(DATA, b"child").unwrap();
    let mut buf = [0u8; 6];
    parent.read_bytes(DATA, &mut buf).unwrap();
    assert_eq!(&buf, b"parent");

    child.destroy();
    assert_eq!(m.coremap.stats().unwrap().used, used - (3 + 1 + 12));
    parent.destroy();
}

#[test]
fn test_processes_on_threads_get_private_frames() {
    let m = Machine::booted(512);

    std::thread::scope(|s| {
        for id in 0..4u8 {
            let m = &m;
            s.spawn(move || {
                let (space, _) = load(m, &[id; 4096], &[id; 100]);
                let mut tlb = CheckedTlb::new(8);
                space.activate(&mut tlb);
                vm_fault(&mut tlb, Some(&space), WRITE, DATA + 50).unwrap();

                let mut buf = [0u8; 100];
                space.read_bytes(DATA, &mut buf).unwrap();
                assert!(buf.iter().all(|&b| b == id));
                space.destroy();
            });
        }
    });

    assert_eq!(m.coremap.stats().unwrap().used, 0);
}
