//! Per-principal descriptor tables.
//!
//! A [`Universe`] maps numeric handles to descriptors for one principal.
//! Descriptors transferred over a stream (pull and accept completions) are
//! attached into the recipient's universe and named by the returned
//! [`Handle`].

use alloc::collections::BTreeMap;

use spin::Mutex;

use crate::descriptor::AnyDescriptor;

/// First handle value a universe hands out.
pub const FIRST_HANDLE: u64 = 1;

/// Numeric name of a descriptor within a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u64);

impl Handle {
    /// The invalid handle.
    pub const INVALID: Handle = Handle(0);
}

struct UniverseInner {
    /// Next handle value. Monotonic; handles are never reused.
    next_handle: u64,

    /// Attached descriptors.
    descriptors: BTreeMap<Handle, AnyDescriptor>,
}

/// A principal's descriptor table.
pub struct Universe {
    inner: Mutex<UniverseInner>,
}

impl Universe {
    /// Create an empty universe.
    pub fn new() -> Universe {
        Universe {
            inner: Mutex::new(UniverseInner {
                next_handle: FIRST_HANDLE,
                descriptors: BTreeMap::new(),
            }),
        }
    }

    /// Attach a descriptor, allocating a fresh handle for it.
    pub fn attach_descriptor(&self, descriptor: AnyDescriptor) -> Handle {
        let mut inner = self.inner.lock();
        let handle = Handle(inner.next_handle);
        inner.next_handle += 1;
        inner.descriptors.insert(handle, descriptor);
        handle
    }

    /// Look up a descriptor by handle.
    pub fn get_descriptor(&self, handle: Handle) -> Option<AnyDescriptor> {
        self.inner.lock().descriptors.get(&handle).cloned()
    }

    /// Remove a descriptor from the table.
    pub fn detach_descriptor(&self, handle: Handle) -> Option<AnyDescriptor> {
        self.inner.lock().descriptors.remove(&handle)
    }

    /// Number of attached descriptors.
    pub fn handle_count(&self) -> usize {
        self.inner.lock().descriptors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MemoryDescriptor, MemoryFlags, ThreadDescriptor, ThreadId};

    #[test]
    fn test_attach_allocates_monotonic_handles() {
        let universe = Universe::new();

        let m = MemoryDescriptor::new(4096, MemoryFlags::READ);
        let h1 = universe.attach_descriptor(AnyDescriptor::Memory(m.clone()));
        let h2 = universe.attach_descriptor(AnyDescriptor::Memory(m));

        assert_eq!(h1, Handle(FIRST_HANDLE));
        assert!(h2 > h1);
        assert_eq!(universe.handle_count(), 2);
    }

    #[test]
    fn test_get_resolves_attached_descriptor() {
        let universe = Universe::new();
        let t = ThreadDescriptor::new(ThreadId(3));

        let h = universe.attach_descriptor(AnyDescriptor::Thread(t));
        assert_eq!(universe.get_descriptor(h), Some(AnyDescriptor::Thread(t)));
        assert_eq!(universe.get_descriptor(Handle::INVALID), None);
    }

    #[test]
    fn test_detach_does_not_recycle_handles() {
        let universe = Universe::new();
        let t = AnyDescriptor::Thread(ThreadDescriptor::new(ThreadId(1)));

        let h1 = universe.attach_descriptor(t.clone());
        assert!(universe.detach_descriptor(h1).is_some());
        assert!(universe.detach_descriptor(h1).is_none());

        let h2 = universe.attach_descriptor(t);
        assert_ne!(h1, h2);
    }
}
