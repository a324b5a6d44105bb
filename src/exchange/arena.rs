use crate::error::{try_alloc, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use sync_ptr::SyncMutPtr;

/// Two generation buffers shared by a pool of worker threads.
///
/// One slot is CURRENT, read by everyone; the other is NEXT, written in
/// disjoint slices. Only the coordinator calls [`BufferArena::promote_next`],
/// and only while every worker is parked at a barrier. The barrier
/// supplies the ordering, so plain loads and stores of the index suffice.
pub struct BufferArena {
    slots: [SyncMutPtr<f64>; 2],
    len: usize,
    current: AtomicUsize,
}

impl BufferArena {
    /// `initial` becomes CURRENT; NEXT is allocated alongside it.
    pub fn new(initial: Vec<f64>) -> Result<Self> {
        let len = initial.len();
        let next = try_alloc(len)?;
        let slots = unsafe {
            [
                SyncMutPtr::new(Box::into_raw(initial.into_boxed_slice())
                    as *mut f64),
                SyncMutPtr::new(
                    Box::into_raw(next.into_boxed_slice()) as *mut f64
                ),
            ]
        };
        Ok(BufferArena {
            slots,
            len,
            current: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// CURRENT generation.
    ///
    /// # Safety
    /// No thread may be writing into the CURRENT slot, i.e. the index must
    /// not be toggled while the returned slice is alive.
    pub unsafe fn current(&self) -> &[f64] {
        let ptr = self.slots[self.current_index()].inner();
        std::slice::from_raw_parts(ptr as *const f64, self.len)
    }

    /// A slice of the NEXT generation.
    ///
    /// # Safety
    /// Ranges handed out concurrently must be disjoint, and the slice must
    /// be dropped before the index is toggled.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn next_slice(&self, range: std::ops::Range<usize>) -> &mut [f64] {
        debug_assert!(range.start <= range.end && range.end <= self.len);
        let ptr = self.slots[1 - self.current_index()].inner();
        std::slice::from_raw_parts_mut(ptr.add(range.start), range.len())
    }

    /// Retire CURRENT and make NEXT the new CURRENT.
    /// Only the coordinator calls this, between barriers.
    pub fn promote_next(&self) {
        let current = self.current_index();
        self.current.store(1 - current, Ordering::Relaxed);
    }

    /// Take the CURRENT generation out of the arena.
    pub fn into_current(self) -> Vec<f64> {
        let this = std::mem::ManuallyDrop::new(self);
        let current = this.current_index();
        unsafe {
            drop(this.take_slot(1 - current));
            this.take_slot(current).into_vec()
        }
    }

    /// # Safety
    /// Each slot may be taken at most once.
    unsafe fn take_slot(&self, slot: usize) -> Box<[f64]> {
        let raw = std::ptr::slice_from_raw_parts_mut(
            self.slots[slot].inner(),
            self.len,
        );
        Box::from_raw(raw)
    }
}

impl Drop for BufferArena {
    fn drop(&mut self) {
        unsafe {
            drop(self.take_slot(0));
            drop(self.take_slot(1));
        }
    }
}
