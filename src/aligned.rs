//! 8-byte aligned heap values
//!
//! [`AlignedBox::new`] allocates through an `align(8)` wrapper, which the
//! allocator must honour. [`AlignedBox::probe`] is the fallback for
//! allocators that only guarantee the natural alignment of `T`: it tries a
//! plain allocation, then wrappers that put 2, 4, 6 and 8 bytes of padding
//! in front of the value, and keeps the first whose value address is
//! aligned. Every candidate is an ordinary owned allocation, never a slice
//! of some hand-managed pool.
//!
//! If no candidate is aligned the allocator's alignment period does not
//! divide 8, which breaks an assumption of this crate; the five candidate
//! addresses are dumped and the process aborts.

use std::ops::{Deref, DerefMut};

use crate::console_log;
use crate::error::fatal;
use crate::scratch::HOST_ALIGN;

#[repr(C, align(8))]
struct Align8<T>(T);

#[repr(C)]
struct Padded<T, const N: usize> {
    _pad: [u8; N],
    value: T,
}

impl<T: Default, const N: usize> Padded<T, N> {
    fn boxed() -> Box<Self> {
        Box::new(Self {
            _pad: [0; N],
            value: T::default(),
        })
    }
}

enum Slot<T> {
    Direct(Box<Align8<T>>),
    Plain(Box<T>),
    Pad2(Box<Padded<T, 2>>),
    Pad4(Box<Padded<T, 4>>),
    Pad6(Box<Padded<T, 6>>),
    Pad8(Box<Padded<T, 8>>),
}

/// Padding amounts tried by [`AlignedBox::probe`], in order
pub const PROBE_PADDING: [usize; 5] = [0, 2, 4, 6, 8];

/// Index of the first 8-byte aligned address among probe candidates
pub fn first_aligned(candidates: &[usize; 5]) -> Option<usize> {
    candidates.iter().position(|addr| addr % HOST_ALIGN == 0)
}

/// Owned `T` whose address is a multiple of 8
pub struct AlignedBox<T> {
    slot: Slot<T>,
}

impl<T> AlignedBox<T> {
    /// Allocate `value` with explicit 8-byte alignment
    pub fn new(value: T) -> Self {
        Self {
            slot: Slot::Direct(Box::new(Align8(value))),
        }
    }

    pub fn addr(&self) -> usize {
        self.deref() as *const T as usize
    }
}

impl<T: Default> AlignedBox<T> {
    /// Find an aligned `T::default()` by trying padded layouts
    pub fn probe() -> Self {
        let v0: Box<T> = Box::default();
        let v2 = Padded::<T, 2>::boxed();
        let v4 = Padded::<T, 4>::boxed();
        let v6 = Padded::<T, 6>::boxed();
        let v8 = Padded::<T, 8>::boxed();

        let candidates = [
            &*v0 as *const T as usize,
            &v2.value as *const T as usize,
            &v4.value as *const T as usize,
            &v6.value as *const T as usize,
            &v8.value as *const T as usize,
        ];

        let slot = match first_aligned(&candidates) {
            Some(0) => Slot::Plain(v0),
            Some(1) => Slot::Pad2(v2),
            Some(2) => Slot::Pad4(v4),
            Some(3) => Slot::Pad6(v6),
            Some(_) => Slot::Pad8(v8),
            None => {
                for (pad, addr) in PROBE_PADDING.iter().zip(candidates) {
                    console_log!("{}ptr= {:#x}", pad, addr);
                }
                fatal("failed to allocate aligned value");
            }
        };
        Self { slot }
    }
}

impl<T> Deref for AlignedBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.slot {
            Slot::Direct(b) => &b.0,
            Slot::Plain(b) => &**b,
            Slot::Pad2(b) => &b.value,
            Slot::Pad4(b) => &b.value,
            Slot::Pad6(b) => &b.value,
            Slot::Pad8(b) => &b.value,
        }
    }
}

impl<T> DerefMut for AlignedBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.slot {
            Slot::Direct(b) => &mut b.0,
            Slot::Plain(b) => &mut **b,
            Slot::Pad2(b) => &mut b.value,
            Slot::Pad4(b) => &mut b.value,
            Slot::Pad6(b) => &mut b.value,
            Slot::Pad8(b) => &mut b.value,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for AlignedBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AlignedBox").field(self.deref()).finish()
    }
}
