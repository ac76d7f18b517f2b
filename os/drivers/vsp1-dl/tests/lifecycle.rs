mod common;

use common::{FakePlatform, continuous, headerless, singleshot};
use vsp1_dl::{DL_NUM_ENTRIES, DlError, Manager, ManagerConfig};

#[test]
fn failed_creation_releases_what_it_allocated() {
    let p = FakePlatform::new();
    p.fail_after(2);

    let err = Manager::create(&p, continuous(4)).unwrap_err();
    assert_eq!(err, DlError::OutOfMemory);
    assert_eq!(p.allocs(), 2);
    assert_eq!(p.frees(), 2);
    assert_eq!(p.live_allocations(), 0);
}

#[test]
fn lists_are_sized_for_entries_and_header() {
    let p = FakePlatform::new();
    let m = Manager::create(&p, continuous(1).with_num_entries(16)).unwrap();
    assert_eq!(m.num_entries(), 16);

    let dl = m.get().unwrap();
    // the header sits right behind the entries
    assert_eq!(dl.header_address().unwrap(), dl.body_address().offset(16 * 8));
    m.put(dl).unwrap();

    let m = Manager::create(&p, headerless(1)).unwrap();
    assert_eq!(m.num_entries(), DL_NUM_ENTRIES);
    assert_eq!(m.capacity(), 1);
}

#[test]
fn retired_fragments_wait_for_the_collector() {
    let p = FakePlatform::new();
    let m = Manager::create(&p, continuous(2)).unwrap();

    let mut dl = m.get().unwrap();
    let mut frag = m.alloc_fragment(4).unwrap();
    frag.write(0x0300, 1);
    dl.add_fragment(frag).unwrap();
    dl.add_fragment(m.alloc_fragment(4).unwrap()).unwrap();
    assert_eq!(p.live_allocations(), 4);

    m.put(dl).unwrap();
    // the pool got its list back, the fragments are not freed yet
    assert_eq!(m.free_count(), 2);
    assert_eq!(m.gc_pending(), 2);
    assert_eq!(p.scheduled(), 1);
    assert_eq!(p.live_allocations(), 4);

    assert_eq!(m.collect_garbage(), 2);
    assert_eq!(m.gc_pending(), 0);
    assert_eq!(p.live_allocations(), 2);
    assert_eq!(m.collect_garbage(), 0);
}

#[test]
fn collector_frees_in_retirement_order() {
    let p = FakePlatform::new();
    let m = Manager::create(&p, continuous(2)).unwrap();

    let mut a = m.get().unwrap();
    let mut b = m.get().unwrap();
    let frags: Vec<_> = (0..3).map(|_| m.alloc_fragment(1).unwrap()).collect();
    let addrs: Vec<_> = frags.iter().map(|f| f.dma()).collect();
    let mut frags = frags.into_iter();
    a.add_fragment(frags.next().unwrap()).unwrap();
    a.add_fragment(frags.next().unwrap()).unwrap();
    b.add_fragment(frags.next().unwrap()).unwrap();

    m.put(a).unwrap();
    m.put(b).unwrap();
    assert_eq!(m.gc_pending(), 3);
    assert_eq!(p.scheduled(), 2);

    assert_eq!(m.collect_garbage(), 3);
    assert_eq!(p.freed(), addrs);
    assert_eq!(m.gc_pending(), 0);
    assert_eq!(m.free_count(), 2);
}

#[test]
fn frame_end_defers_fragment_release() {
    let p = FakePlatform::new();
    let m = Manager::create(&p, continuous(2)).unwrap();

    let mut a = m.get().unwrap();
    a.add_fragment(m.alloc_fragment(1).unwrap()).unwrap();
    m.commit(a, false).unwrap();
    let _ = m.irq_frame_end();
    assert_eq!(p.scheduled(), 0);

    m.commit(m.get().unwrap(), false).unwrap();
    let _ = m.irq_frame_end();

    // `a` was retired by the interrupt; only the work item frees memory
    assert_eq!(p.scheduled(), 1);
    assert_eq!(p.frees(), 0);
    assert_eq!(m.collect_garbage(), 1);
    assert_eq!(p.frees(), 1);
}

#[test]
fn destroy_frees_everything() {
    let p = FakePlatform::new();
    let m = Manager::create(&p, continuous(3)).unwrap();

    // a queued list with a fragment, and an uncollected one
    let mut a = m.get().unwrap();
    a.add_fragment(m.alloc_fragment(2).unwrap()).unwrap();
    m.commit(a, false).unwrap();

    let mut b = m.get().unwrap();
    b.add_fragment(m.alloc_fragment(2).unwrap()).unwrap();
    m.put(b).unwrap();
    assert_eq!(m.gc_pending(), 1);

    m.destroy();
    assert_eq!(p.cancelled(), 1);
    assert_eq!(p.live_allocations(), 0);
    assert_eq!(p.allocs(), p.frees());
}

#[test]
fn dropping_the_manager_is_destroy() {
    let p = FakePlatform::new();
    {
        let m = Manager::create(&p, singleshot(2)).unwrap();
        m.commit(m.get().unwrap(), false).unwrap();
    }
    assert_eq!(p.cancelled(), 1);
    assert_eq!(p.live_allocations(), 0);
}

#[test]
fn for_output_matches_the_manager() {
    let p = FakePlatform::new();
    let cfg = ManagerConfig::for_output(2, 1, false);
    let m = Manager::create(&p, cfg).unwrap();
    assert_eq!(m.index(), 2);
    assert!(!m.is_singleshot());
    let dl = m.get().unwrap();
    assert!(dl.header().is_some());
    m.put(dl).unwrap();
}
