//! WASI preview1 ABI value types and records
//!
//! Everything that crosses into the host is marshalled through the widths
//! defined here, whatever the native pointer width of the guest.
//!
//! Field reference:
//! <https://github.com/WebAssembly/WASI/blob/main/legacy/preview1/docs.md>
//!
//! ## Record layouts
//!
//! ```text
//! iovec (8 bytes, align 4)
//!   [0..4]   buf      (host address)
//!   [4..8]   buf_len  (size)
//!
//! subscription (48 bytes, align 8)
//!   [0..8]   userdata
//!   [8]      tag      (eventtype)
//!   [9..16]  padding
//!   [16..48] body
//!     clock:     [0..4] id, [4..8] pad, [8..16] timeout, [16..24] precision, [24..26] flags
//!     fd_read:   [0..4] file descriptor
//!     fd_write:  [0..4] file descriptor
//!
//! event (32 bytes, align 8)
//!   [0..8]   userdata
//!   [8..10]  error    (16-bit errno)
//!   [10]     type     (eventtype)
//!   [11..16] padding
//!   [16..24] fd_readwrite.nbytes
//!   [24..26] fd_readwrite.flags
//!   [26..32] padding
//! ```

use bytemuck::{Pod, Zeroable};

use crate::wire;

/// `size`: byte counts and element counts
pub type Size = u32;

/// `errno` as returned by the imports
///
/// Imports hand back a full 32-bit value; inside the `event` record the
/// field is only 16 bits wide, see [`Event::error`].
pub type Errno = u32;

/// `filesize`
pub type Filesize = u64;

/// `timestamp`: nanoseconds
pub type Timestamp = u64;

/// `clockid`
pub type ClockId = u32;

/// `fd`
pub type Fd = u32;

/// `userdata`: opaque correlation tag echoed back in events
pub type Userdata = u64;

/// `eventtype`
pub type EventType = u8;

/// `eventrwflags`
pub type EventRwFlags = u16;

/// `subclockflags`
pub type SubclockFlags = u16;

/// Name of the import module every binding lives in
pub const IMPORT_MODULE: &str = "wasi_snapshot_preview1";

/// Clock ids
pub mod clock {
    use super::ClockId;

    /// Wall clock, nanoseconds since the Unix epoch
    pub const REALTIME: ClockId = 0;
    /// Monotonic clock with an arbitrary fixed origin
    pub const MONOTONIC: ClockId = 1;
}

/// Event / subscription tags
pub mod eventtype {
    use super::EventType;

    pub const CLOCK: EventType = 0;
    pub const FD_READ: EventType = 1;
    pub const FD_WRITE: EventType = 2;
}

/// `eventrwflags` bits
pub const FD_READWRITE_HANGUP: EventRwFlags = 1 << 0;

/// `subclockflags` bits
pub const SUBSCRIPTION_CLOCK_ABSTIME: SubclockFlags = 1 << 0;

/// Errno values the adapter itself cares about
pub mod errno {
    use super::Errno;

    pub const SUCCESS: Errno = 0;
    pub const BADF: Errno = 8;
    pub const FAULT: Errno = 21;
    pub const INVAL: Errno = 28;
    pub const IO: Errno = 29;
    pub const NOSYS: Errno = 52;
}

/// Standard file descriptors
pub mod fd {
    use super::Fd;

    pub const STDIN: Fd = 0;
    pub const STDOUT: Fd = 1;
    pub const STDERR: Fd = 2;
}

// ============================================================================
// Host addresses
// ============================================================================

/// A guest address as the host sees it: 32 bits wide
///
/// Guests with wider native pointers must narrow before an address is
/// written into any host-facing record. The only way to obtain one is
/// [`HostAddr::narrow`] (or [`HostAddr::pinned`], which also ties the
/// borrow of the pointee to the host call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct HostAddr(u32);

impl HostAddr {
    pub const NULL: HostAddr = HostAddr(0);

    /// Narrow a native pointer to the host's 32-bit address space
    ///
    /// On wasm32 this is lossless. On wider guests the upper bits are
    /// dropped, which matches what the host receives for the same pointer.
    pub fn narrow<T: ?Sized>(ptr: *const T) -> HostAddr {
        HostAddr(ptr.cast::<u8>() as usize as u32)
    }

    /// Narrow `value`'s address for the duration of `call`
    ///
    /// `value` stays borrowed until `call` returns, so the pointee cannot be
    /// freed or moved while the host may still read it.
    pub fn pinned<T: ?Sized, R>(value: &T, call: impl FnOnce(HostAddr) -> R) -> R {
        let addr = HostAddr::narrow(value as *const T);
        call(addr)
    }

    /// Build from a raw host value (host-written tables, tests)
    pub const fn from_raw(raw: u32) -> HostAddr {
        HostAddr(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Byte distance from `base` to `self` in the host's address space
    pub fn offset_from(self, base: HostAddr) -> u32 {
        self.0.wrapping_sub(base.0)
    }

    /// Address `offset` bytes past `self`
    pub fn add(self, offset: u32) -> HostAddr {
        HostAddr(self.0.wrapping_add(offset))
    }
}

// ============================================================================
// iovec
// ============================================================================

/// `ciovec`: one contiguous byte range for `fd_write`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Iovec {
    pub buf: HostAddr,
    pub buf_len: Size,
}

impl Iovec {
    pub const SIZE: usize = 8;

    pub fn new(buf: HostAddr, buf_len: Size) -> Self {
        Self { buf, buf_len }
    }
}

// ============================================================================
// subscription
// ============================================================================

/// `subscription` record for `poll_oneoff`
///
/// Kept as raw bytes with fields placed at their preview1 offsets, so the
/// host's C layout (including padding) is reproduced exactly.
#[derive(Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C, align(8))]
pub struct Subscription([u8; 48]);

impl Subscription {
    pub const SIZE: usize = 48;

    const USERDATA: usize = 0;
    const TAG: usize = 8;
    const BODY: usize = 16;

    // Offsets inside the body. `timeout` follows a 32-bit id, so four
    // padding bytes keep it on an 8-byte boundary.
    const CLOCK_ID: usize = Self::BODY;
    const CLOCK_TIMEOUT: usize = Self::BODY + 8;
    const CLOCK_PRECISION: usize = Self::BODY + 16;
    const CLOCK_FLAGS: usize = Self::BODY + 24;
    const FD: usize = Self::BODY;

    /// Zeroed subscription carrying `userdata`
    pub fn new(userdata: Userdata) -> Self {
        let mut sub = Self::zeroed();
        sub.put_u64(Self::USERDATA, userdata);
        sub
    }

    /// Clock subscription in one step
    pub fn clock(
        userdata: Userdata,
        id: ClockId,
        timeout: Timestamp,
        precision: Timestamp,
        flags: SubclockFlags,
    ) -> Self {
        let mut sub = Self::new(userdata);
        sub.set_clock(id, timeout, precision, flags);
        sub
    }

    /// Clear the body and switch it to `tag`
    fn set_body(&mut self, tag: EventType) -> &mut [u8] {
        self.0[Self::TAG] = tag;
        let body = &mut self.0[Self::BODY..];
        body.fill(0);
        body
    }

    pub fn set_clock(
        &mut self,
        id: ClockId,
        timeout: Timestamp,
        precision: Timestamp,
        flags: SubclockFlags,
    ) {
        self.set_body(eventtype::CLOCK);
        self.put_u32(Self::CLOCK_ID, id);
        self.put_u64(Self::CLOCK_TIMEOUT, timeout);
        self.put_u64(Self::CLOCK_PRECISION, precision);
        self.put_u16(Self::CLOCK_FLAGS, flags);
    }

    pub fn set_fd_read(&mut self, fd: Fd) {
        self.set_body(eventtype::FD_READ);
        self.put_u32(Self::FD, fd);
    }

    pub fn set_fd_write(&mut self, fd: Fd) {
        self.set_body(eventtype::FD_WRITE);
        self.put_u32(Self::FD, fd);
    }

    pub fn userdata(&self) -> Userdata {
        self.get_u64(Self::USERDATA)
    }

    pub fn tag(&self) -> EventType {
        self.0[Self::TAG]
    }

    /// Decoded clock body, if this is a clock subscription
    pub fn as_clock(&self) -> Option<SubscriptionClock> {
        if self.tag() != eventtype::CLOCK {
            return None;
        }
        Some(SubscriptionClock {
            id: self.get_u32(Self::CLOCK_ID),
            timeout: self.get_u64(Self::CLOCK_TIMEOUT),
            precision: self.get_u64(Self::CLOCK_PRECISION),
            flags: self.get_u16(Self::CLOCK_FLAGS),
        })
    }

    /// Descriptor of an fd_read / fd_write subscription
    pub fn as_fd(&self) -> Option<Fd> {
        match self.tag() {
            eventtype::FD_READ | eventtype::FD_WRITE => Some(self.get_u32(Self::FD)),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }

    // Offsets are layout constants checked against SIZE below, so the wire
    // calls cannot fail.
    fn put_u16(&mut self, offset: usize, value: u16) {
        let _ = wire::write_u16(&mut self.0, offset, value);
    }

    fn put_u32(&mut self, offset: usize, value: u32) {
        let _ = wire::write_u32(&mut self.0, offset, value);
    }

    fn put_u64(&mut self, offset: usize, value: u64) {
        let _ = wire::write_u64(&mut self.0, offset, value);
    }

    fn get_u16(&self, offset: usize) -> u16 {
        wire::read_u16(&self.0, offset).unwrap_or_default()
    }

    fn get_u32(&self, offset: usize) -> u32 {
        wire::read_u32(&self.0, offset).unwrap_or_default()
    }

    fn get_u64(&self, offset: usize) -> u64 {
        wire::read_u64(&self.0, offset).unwrap_or_default()
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("Subscription");
        s.field("userdata", &self.userdata()).field("tag", &self.tag());
        if let Some(clock) = self.as_clock() {
            s.field("clock", &clock);
        } else if let Some(fd) = self.as_fd() {
            s.field("fd", &fd);
        }
        s.finish()
    }
}

/// Decoded clock body of a [`Subscription`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionClock {
    pub id: ClockId,
    pub timeout: Timestamp,
    pub precision: Timestamp,
    pub flags: SubclockFlags,
}

impl SubscriptionClock {
    /// Deadline is absolute rather than relative to now
    pub fn is_absolute(&self) -> bool {
        self.flags & SUBSCRIPTION_CLOCK_ABSTIME != 0
    }
}

// ============================================================================
// event
// ============================================================================

/// `event` record filled in by `poll_oneoff`
#[derive(Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C, align(8))]
pub struct Event([u8; 32]);

impl Event {
    pub const SIZE: usize = 32;

    const USERDATA: usize = 0;
    const ERROR: usize = 8;
    const TYPE: usize = 10;
    const NBYTES: usize = 16;
    const FLAGS: usize = 24;

    /// Event as a host would report it
    pub fn new(userdata: Userdata, error: u16, event_type: EventType) -> Self {
        let mut event = Self::zeroed();
        let _ = wire::write_u64(&mut event.0, Self::USERDATA, userdata);
        let _ = wire::write_u16(&mut event.0, Self::ERROR, error);
        event.0[Self::TYPE] = event_type;
        event
    }

    pub fn set_fd_readwrite(&mut self, nbytes: Filesize, flags: EventRwFlags) {
        let _ = wire::write_u64(&mut self.0, Self::NBYTES, nbytes);
        let _ = wire::write_u16(&mut self.0, Self::FLAGS, flags);
    }

    pub fn userdata(&self) -> Userdata {
        wire::read_u64(&self.0, Self::USERDATA).unwrap_or_default()
    }

    /// 16-bit errno for this event
    ///
    /// The field is narrower than [`Errno`]; widening it here would shift
    /// every later field.
    pub fn error(&self) -> u16 {
        wire::read_u16(&self.0, Self::ERROR).unwrap_or_default()
    }

    pub fn event_type(&self) -> EventType {
        self.0[Self::TYPE]
    }

    pub fn nbytes(&self) -> Filesize {
        wire::read_u64(&self.0, Self::NBYTES).unwrap_or_default()
    }

    pub fn flags(&self) -> EventRwFlags {
        wire::read_u16(&self.0, Self::FLAGS).unwrap_or_default()
    }

    pub fn is_hangup(&self) -> bool {
        self.flags() & FD_READWRITE_HANGUP != 0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event")
            .field("userdata", &self.userdata())
            .field("error", &self.error())
            .field("type", &self.event_type())
            .field("nbytes", &self.nbytes())
            .field("flags", &self.flags())
            .finish()
    }
}

// Layout self-check against the preview1 C layout.
const _: () = {
    use core::mem::{align_of, offset_of, size_of};

    assert!(size_of::<HostAddr>() == 4);

    assert!(size_of::<Iovec>() == Iovec::SIZE);
    assert!(align_of::<Iovec>() == 4);
    assert!(offset_of!(Iovec, buf) == 0);
    assert!(offset_of!(Iovec, buf_len) == 4);

    assert!(size_of::<Subscription>() == Subscription::SIZE);
    assert!(align_of::<Subscription>() == 8);
    assert!(Subscription::CLOCK_TIMEOUT % 8 == 0);
    assert!(Subscription::CLOCK_PRECISION % 8 == 0);
    assert!(Subscription::CLOCK_FLAGS + 2 <= Subscription::SIZE);

    assert!(size_of::<Event>() == Event::SIZE);
    assert!(align_of::<Event>() == 8);
    assert!(Event::NBYTES % 8 == 0);
    assert!(Event::FLAGS + 2 <= Event::SIZE);
};
