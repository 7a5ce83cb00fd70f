use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;

use rustc_hash::{FxHashMap, FxHashSet};

use super::heap::{HostObject, NATIVE_ALIGN, NativeSpace, ObjectHeap};
use crate::def::{Def, SlotId};
use crate::layout::resolve_layout_over;
use crate::param::{resolve_bases, validate_params};
use crate::spec::{check_gc, check_sizes, split_name};
use crate::{Context, Handle, HostError, ObjectHead, SpecParam, TypeFlags, TypeInfo, TypeSpec};

/// Offset of a pure instance's struct behind the host header.
const PURE_STRUCT_OFFSET: usize = size_of::<ObjectHead>().next_multiple_of(NATIVE_ALIGN);

/// How the host reclaims objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GcMode {
    /// Reference counting with cycle collection; GC types must be traversable.
    #[default]
    RefCounting,
    /// Tracing collector; the GC flag is advisory.
    Tracing,
}

/// A host-provided type registered at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinType {
    pub name: String,
    pub basicsize: i32,
    pub itemsize: i32,
    pub flags: TypeFlags,
    pub legacy: bool,
}

impl BuiltinType {
    /// A subclassable, pure builtin with no struct.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            basicsize: 0,
            itemsize: 0,
            flags: TypeFlags::VERSION_TAG_TRACKING | TypeFlags::BASE_TYPE,
            legacy: false,
        }
    }

    pub fn basicsize(mut self, size: i32) -> Self {
        self.basicsize = size;
        self
    }

    pub fn itemsize(mut self, size: i32) -> Self {
        self.itemsize = size;
        self
    }

    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }
}

/// Reference host configuration.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    pub gc_mode: GcMode,
    /// Registered after the core builtins, in order.
    pub builtins: Vec<BuiltinType>,
}

impl HostConfig {
    pub fn with_gc_mode(mut self, mode: GcMode) -> Self {
        self.gc_mode = mode;
        self
    }

    pub fn with_builtin(mut self, builtin: BuiltinType) -> Self {
        self.builtins.push(builtin);
        self
    }
}

/// A type object as stored by [`LocalHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredType {
    /// Full, possibly dotted, name.
    pub name: String,
    pub basicsize: i32,
    pub itemsize: i32,
    pub flags: TypeFlags,
    pub legacy: bool,
    pub builtin: bool,
    pub bases: Vec<Handle>,
    pub doc: Option<String>,
    /// Slots after overrides, in definition order.
    pub slots: Vec<SlotId>,
    /// Attribute names after overrides, in definition order.
    pub attrs: Vec<String>,
    /// The host supplies the constructor.
    pub default_new: bool,
}

impl RegisteredType {
    pub fn module_name(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    pub fn type_name(&self) -> &str {
        split_name(&self.name).1
    }

    pub fn info(&self) -> TypeInfo {
        TypeInfo {
            name: self.type_name().to_owned(),
            module: self.module_name().map(str::to_owned),
            basicsize: self.basicsize,
            itemsize: self.itemsize,
            flags: self.flags,
            legacy: self.legacy,
            builtin: self.builtin,
        }
    }

    fn from_builtin(b: BuiltinType, bases: Vec<Handle>) -> Self {
        Self {
            name: b.name,
            basicsize: b.basicsize,
            itemsize: b.itemsize,
            flags: b.flags,
            legacy: b.legacy,
            builtin: true,
            bases,
            doc: None,
            slots: Vec::new(),
            attrs: Vec::new(),
            default_new: false,
        }
    }
}

/// Native memory of one instance.
///
/// A legacy struct starts at offset 0 and contains the header; a pure struct
/// starts at [`PURE_STRUCT_OFFSET`], behind a header the extension never sees.
#[derive(Debug)]
pub(crate) struct Instance {
    ty: Handle,
    struct_offset: usize,
    space: NativeSpace,
}

impl Instance {
    fn head(&self) -> *mut ObjectHead {
        self.space.as_ptr().cast()
    }

    fn struct_ptr(&self) -> *mut c_void {
        // SAFETY: the offset is within the allocation by construction.
        unsafe { self.space.as_ptr().add(self.struct_offset).cast() }
    }
}

/// In-process reference host.
///
/// Objects live in a generational handle table, so stale handles are
/// detected. Instance memory is handed out as raw pointers, which makes the
/// host neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct LocalHost {
    heap: ObjectHeap,
    names: FxHashMap<String, Handle>,
    gc_mode: GcMode,
    object: Handle,
    type_type: Handle,
    tuple: Handle,
}

impl LocalHost {
    /// Create a host with the core builtins and those of `config`.
    pub fn new(config: HostConfig) -> Result<Self, HostError> {
        let mut host = Self::with_core(config.gc_mode);
        for builtin in config.builtins {
            host.register_builtin(builtin)?;
        }
        Ok(host)
    }

    fn with_core(gc_mode: GcMode) -> Self {
        let mut host = Self {
            heap: ObjectHeap::new(),
            names: FxHashMap::default(),
            gc_mode,
            object: Handle::NULL,
            type_type: Handle::NULL,
            tuple: Handle::NULL,
        };
        host.object = host.insert_type(RegisteredType::from_builtin(BuiltinType::new("object"), vec![]));
        let object = host.object;
        host.heap.add_ref(object);
        host.heap.add_ref(object);
        host.type_type = host.insert_type(RegisteredType::from_builtin(
            BuiltinType::new("type")
                .flags(TypeFlags::VERSION_TAG_TRACKING)
                .legacy(true),
            vec![object],
        ));
        host.tuple = host.insert_type(RegisteredType::from_builtin(
            BuiltinType::new("tuple").basicsize(24).itemsize(8).legacy(true),
            vec![object],
        ));
        host
    }

    /// The universal base type.
    pub fn object_type(&self) -> Handle {
        self.object
    }

    /// The type of type objects.
    pub fn type_type(&self) -> Handle {
        self.type_type
    }

    /// The type of tuples; a legacy builtin.
    pub fn tuple_type(&self) -> Handle {
        self.tuple
    }

    pub fn gc_mode(&self) -> GcMode {
        self.gc_mode
    }

    /// Register a host-provided type deriving from `object`.
    pub fn register_builtin(&mut self, builtin: BuiltinType) -> Result<Handle, HostError> {
        check_sizes(builtin.basicsize, builtin.itemsize)?;
        if self.names.contains_key(&builtin.name) {
            return Err(HostError::DuplicateTypeName { name: builtin.name });
        }
        let object = self.object;
        self.heap.add_ref(object);
        Ok(self.insert_type(RegisteredType::from_builtin(builtin, vec![object])))
    }

    fn insert_type(&mut self, ty: RegisteredType) -> Handle {
        let name = ty.name.clone();
        let h = self.heap.allocate(HostObject::Type(ty));
        self.names.insert(name, h);
        h
    }

    /// Look a type up by its full name.
    pub fn lookup_type(&self, name: &str) -> Option<Handle> {
        self.names.get(name).copied()
    }

    pub fn registered_type(&self, ty: Handle) -> Option<&RegisteredType> {
        match self.heap.get(ty)? {
            HostObject::Type(t) => Some(t),
            _ => None,
        }
    }

    fn type_or_err(&self, ty: Handle) -> Result<&RegisteredType, HostError> {
        match self.heap.get(ty) {
            Some(HostObject::Type(t)) => Ok(t),
            Some(_) => Err(HostError::NotAType(ty)),
            None => Err(HostError::UnknownHandle(ty)),
        }
    }

    /// Create a tuple; the tuple holds a reference to each live item.
    pub fn new_tuple(&mut self, items: Vec<Handle>) -> Handle {
        for item in &items {
            self.heap.add_ref(*item);
        }
        self.heap.allocate(HostObject::Tuple(items))
    }

    /// Allocate a zeroed instance of `ty` with room for `nitems` items.
    ///
    /// The host writes the header; the struct is all zeros.
    pub fn new_instance(&mut self, ty: Handle, nitems: usize) -> Result<Handle, HostError> {
        let t = self.type_or_err(ty)?;
        let too_large = || HostError::InstanceTooLarge {
            name: t.name.clone(),
            nitems,
        };

        let basicsize = usize::try_from(t.basicsize).unwrap_or(0);
        let itemsize = usize::try_from(t.itemsize).unwrap_or(0);
        let payload = itemsize
            .checked_mul(nitems)
            .and_then(|items| items.checked_add(basicsize))
            .ok_or_else(too_large)?;
        let (struct_offset, total) = if t.legacy {
            (0, payload.max(size_of::<ObjectHead>()))
        } else {
            let total = payload.checked_add(PURE_STRUCT_OFFSET).ok_or_else(too_large)?;
            (PURE_STRUCT_OFFSET, total)
        };
        let space = NativeSpace::zeroed(total).ok_or_else(too_large)?;

        let instance = Instance {
            ty,
            struct_offset,
            space,
        };
        // SAFETY: the allocation is aligned and at least header-sized.
        unsafe {
            instance.head().write(ObjectHead {
                ob_refcnt: 1,
                ob_type: ty,
            });
        }
        tracing::trace!(ty = %ty, size = total, nitems, "allocated instance");

        self.heap.add_ref(ty);
        Ok(self.heap.allocate(HostObject::Instance(instance)))
    }

    /// Size in bytes of an instance's struct, header included for legacy types.
    pub fn instance_size(&self, h: Handle) -> Option<usize> {
        match self.heap.get(h)? {
            HostObject::Instance(i) => Some(i.space.size() - i.struct_offset),
            _ => None,
        }
    }

    /// Take a new reference to a live object.
    pub fn add_ref(&mut self, h: Handle) -> bool {
        let live = self.heap.add_ref(h);
        self.sync_head(h);
        live
    }

    /// Drop one reference; freeing cascades to whatever the object held.
    ///
    /// Returns `false` for an unknown or stale handle.
    pub fn release(&mut self, h: Handle) -> bool {
        if self.heap.get(h).is_none() {
            return false;
        }
        let mut pending = vec![h];
        while let Some(h) = pending.pop() {
            let Some(freed) = self.heap.release(h) else {
                self.sync_head(h);
                continue;
            };
            match freed {
                HostObject::Type(t) => {
                    if self.names.get(&t.name) == Some(&h) {
                        self.names.remove(&t.name);
                    }
                    tracing::debug!(name = %t.name, handle = %h, "type freed");
                    pending.extend(t.bases);
                }
                HostObject::Tuple(items) => pending.extend(items),
                HostObject::Instance(i) => pending.push(i.ty),
            }
        }
        true
    }

    pub fn ref_count(&self, h: Handle) -> Option<u32> {
        self.heap.ref_count(h)
    }

    /// Number of live objects, builtins included.
    pub fn live_objects(&self) -> usize {
        self.heap.live()
    }

    fn sync_head(&mut self, h: Handle) {
        let count = self.heap.ref_count(h);
        if let (Some(HostObject::Instance(i)), Some(count)) = (self.heap.get(h), count) {
            // SAFETY: every instance starts with an initialized header.
            unsafe { (*i.head()).ob_refcnt = count as isize };
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn create_type(&mut self, spec: &TypeSpec, params: &[SpecParam]) -> Result<Handle, HostError> {
        spec.validate()?;
        validate_params(params, &*self)?;
        if self.names.contains_key(&spec.name) {
            return Err(HostError::DuplicateTypeName {
                name: spec.name.clone(),
            });
        }

        let mut bases = resolve_bases(params, &*self)?;
        if bases.is_empty() {
            bases.push(self.object);
        }
        for base in &bases {
            let t = self.type_or_err(*base)?;
            if !t.flags.contains(TypeFlags::BASE_TYPE) {
                return Err(HostError::BaseNotSubclassable {
                    base: t.name.clone(),
                });
            }
        }

        let mut layouts = Vec::with_capacity(bases.len());
        let (mut base_basicsize, mut base_itemsize) = (0, 0);
        for base in &bases {
            let t = self.type_or_err(*base)?;
            base_basicsize = base_basicsize.max(t.basicsize);
            base_itemsize = base_itemsize.max(t.itemsize);
            if *base != self.object {
                layouts.push(t.info().layout());
            }
        }
        let legacy = resolve_layout_over(spec, &layouts)?;
        if self.gc_mode == GcMode::RefCounting {
            check_gc(spec)?;
        }

        // an inherited struct is the largest one among the bases
        let basicsize = if spec.basicsize == 0 {
            base_basicsize
        } else {
            spec.basicsize
        };
        let itemsize = if spec.itemsize == 0 {
            base_itemsize
        } else {
            spec.itemsize
        };

        let mut slots = Vec::new();
        let mut attrs = Vec::new();
        for def in spec.effective_defines() {
            match def {
                Def::Slot(s) => slots.push(s.slot),
                _ => attrs.extend(def.name().map(str::to_owned)),
            }
        }
        let default_new = spec.basicsize > 0 && !slots.contains(&SlotId::TpNew);

        for base in &bases {
            self.heap.add_ref(*base);
        }
        let h = self.insert_type(RegisteredType {
            name: spec.name.clone(),
            basicsize,
            itemsize,
            flags: spec.flags | TypeFlags::HEAP_ALLOCATED,
            legacy,
            builtin: false,
            bases,
            doc: spec.doc.clone(),
            slots,
            attrs,
            default_new,
        });
        tracing::debug!(
            name = %spec.name,
            handle = %h,
            legacy,
            basicsize,
            itemsize,
            "registered type from spec"
        );
        Ok(h)
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::with_core(GcMode::default())
    }
}

impl Context for LocalHost {
    /// For pure instances, the struct behind the hidden header; for legacy
    /// instances, the struct itself. Null for anything else.
    fn as_struct(&self, h: Handle) -> *mut c_void {
        match self.heap.get(h) {
            Some(HostObject::Instance(i)) => i.struct_ptr(),
            _ => ptr::null_mut(),
        }
    }

    /// The header-prefixed object of any instance. Null for anything else.
    fn as_struct_legacy(&self, h: Handle) -> *mut c_void {
        match self.heap.get(h) {
            Some(HostObject::Instance(i)) => i.head().cast(),
            _ => ptr::null_mut(),
        }
    }

    fn type_from_spec(&mut self, spec: &TypeSpec, params: &[SpecParam]) -> Result<Handle, HostError> {
        self.create_type(spec, params)
    }

    fn is_type(&self, h: Handle) -> bool {
        matches!(self.heap.get(h), Some(HostObject::Type(_)))
    }

    fn tuple_items(&self, h: Handle) -> Option<Vec<Handle>> {
        match self.heap.get(h)? {
            HostObject::Tuple(items) => Some(items.clone()),
            _ => None,
        }
    }

    fn type_of(&self, h: Handle) -> Option<Handle> {
        Some(match self.heap.get(h)? {
            HostObject::Type(_) => self.type_type,
            HostObject::Tuple(_) => self.tuple,
            HostObject::Instance(i) => i.ty,
        })
    }

    fn type_info(&self, ty: Handle) -> Option<TypeInfo> {
        self.registered_type(ty).map(RegisteredType::info)
    }

    fn is_subtype(&self, sub: Handle, ty: Handle) -> bool {
        let mut seen = FxHashSet::default();
        let mut stack = vec![sub];
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            let Some(t) = self.registered_type(h) else {
                continue;
            };
            if h == ty {
                return true;
            }
            stack.extend(t.bases.iter().copied());
        }
        false
    }
}
