//! Generational handle table for the reference host.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

use crate::Handle;

use super::local::{Instance, RegisteredType};

/// Alignment of every instance allocation (`max_align_t` on common targets).
pub(crate) const NATIVE_ALIGN: usize = 16;

/// Something a handle can refer to.
#[derive(Debug)]
pub(crate) enum HostObject {
    Type(RegisteredType),
    Tuple(Vec<Handle>),
    Instance(Instance),
}

/// Zeroed native memory backing one instance.
pub(crate) struct NativeSpace {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl NativeSpace {
    /// Allocate `size` zeroed bytes; `None` if the size cannot be laid out.
    pub(crate) fn zeroed(size: usize) -> Option<Self> {
        let layout = Layout::from_size_align(size.max(1), NATIVE_ALIGN).ok()?;
        // SAFETY: the layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Some(Self { ptr, layout })
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for NativeSpace {
    fn drop(&mut self) {
        // SAFETY: allocated in `zeroed` with exactly this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl fmt::Debug for NativeSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSpace")
            .field("ptr", &self.ptr)
            .field("size", &self.layout.size())
            .finish()
    }
}

/// Object storage with generational handles.
///
/// A freed slot is reused with its generation bumped, so a stale handle never
/// resolves to the new occupant.
pub(crate) struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

struct HeapSlot {
    generation: u32,
    value: Option<HostObject>,
    ref_count: u32,
}

impl ObjectHeap {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Store an object with a reference count of one.
    pub(crate) fn allocate(&mut self, value: HostObject) -> Handle {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            slot.ref_count = 1;
            Handle::pack(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                value: Some(value),
                ref_count: 1,
            });
            Handle::pack(index, 0)
        }
    }

    fn slot(&self, h: Handle) -> Option<&HeapSlot> {
        let (index, generation) = h.unpack()?;
        let slot = self.slots.get(index as usize)?;
        (slot.generation == generation && slot.value.is_some()).then_some(slot)
    }

    fn slot_mut(&mut self, h: Handle) -> Option<&mut HeapSlot> {
        let (index, generation) = h.unpack()?;
        let slot = self.slots.get_mut(index as usize)?;
        (slot.generation == generation && slot.value.is_some()).then_some(slot)
    }

    pub(crate) fn get(&self, h: Handle) -> Option<&HostObject> {
        self.slot(h)?.value.as_ref()
    }

    /// Increment the reference count; `false` for a stale handle.
    pub(crate) fn add_ref(&mut self, h: Handle) -> bool {
        match self.slot_mut(h) {
            Some(slot) => {
                slot.ref_count = slot.ref_count.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Decrement the reference count, freeing at zero.
    ///
    /// Returns the freed object so the caller can release what it referenced.
    pub(crate) fn release(&mut self, h: Handle) -> Option<HostObject> {
        let (index, _) = h.unpack()?;
        let slot = self.slot_mut(h)?;
        slot.ref_count = slot.ref_count.saturating_sub(1);
        if slot.ref_count > 0 {
            return None;
        }
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(index);
        value
    }

    pub(crate) fn ref_count(&self, h: Handle) -> Option<u32> {
        self.slot(h).map(|slot| slot.ref_count)
    }

    /// Number of live objects.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}
