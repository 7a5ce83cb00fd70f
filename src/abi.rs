//! Wire layout of type specifications.
//!
//! These `#[repr(C)]` structs are what hosts and extensions exchange across
//! the native boundary. Field order and widths are fixed:
//!
//! ```text
//! RawTypeSpec
//! ├── name          *const c_char          NUL-terminated UTF-8, non-empty
//! ├── basicsize     c_int                  >= 0
//! ├── itemsize      c_int                  >= 0
//! ├── flags         c_ulong                TypeFlags bits
//! ├── legacy        c_int                  0 or 1
//! ├── legacy_slots  *mut c_void            null unless legacy
//! ├── defines       *const *const RawDef   NULL-terminated, may be null
//! └── doc           *const c_char          nullable
//!
//! RawDef
//! ├── kind          c_int                  DefKind, selects the payload
//! └── def           union                  RawSlot | RawMeth | RawMember | RawGetSet
//!
//! RawSpecParam
//! ├── kind          c_int                  SpecParamKind
//! └── object        Handle
//! ```

use std::ffi::{CStr, CString, c_char, c_int, c_ulong, c_void};
use std::fmt;
use std::ptr;

use crate::def::{
    CFunction, DefKind, FuncSignature, GetSetDef, MemberDef, MemberKind, MethodDef, SlotId,
    def_kind_from_raw,
};
use crate::spec::check_sizes;
use crate::{ConfigError, Def, LegacySlots, SpecParam, SpecParamKind, TypeFlags, TypeSpec};

/// Wire form of a [`TypeSpec`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawTypeSpec {
    pub name: *const c_char,
    pub basicsize: c_int,
    pub itemsize: c_int,
    pub flags: c_ulong,
    pub legacy: c_int,
    pub legacy_slots: *mut c_void,
    pub defines: *const *const RawDef,
    pub doc: *const c_char,
}

/// Wire form of a slot definition.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawSlot {
    pub slot: c_int,
    pub func: Option<CFunction>,
}

/// Wire form of a method definition.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawMeth {
    pub name: *const c_char,
    pub func: Option<CFunction>,
    pub signature: c_int,
    pub doc: *const c_char,
}

/// Wire form of a member definition.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawMember {
    pub name: *const c_char,
    pub kind: c_int,
    pub offset: isize,
    pub readonly: c_int,
    pub doc: *const c_char,
}

/// Wire form of a get/set definition.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawGetSet {
    pub name: *const c_char,
    pub getter: Option<CFunction>,
    pub setter: Option<CFunction>,
    pub doc: *const c_char,
}

/// Payload of a [`RawDef`]; the active field is named by `RawDef::kind`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union RawDefPayload {
    pub slot: RawSlot,
    pub meth: RawMeth,
    pub member: RawMember,
    pub getset: RawGetSet,
}

/// Wire form of a [`Def`].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawDef {
    pub kind: c_int,
    pub def: RawDefPayload,
}

impl fmt::Debug for RawDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDef")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Wire form of a [`SpecParam`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSpecParam {
    pub kind: c_int,
    pub object: crate::Handle,
}

impl RawTypeSpec {
    pub fn flags(&self) -> TypeFlags {
        TypeFlags::from_raw(self.flags)
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy != 0
    }

    /// The name, or `None` when the pointer is null.
    ///
    /// # Safety
    ///
    /// A non-null `name` must point to a NUL-terminated string that outlives
    /// the returned reference.
    pub unsafe fn name(&self) -> Option<&CStr> {
        if self.name.is_null() {
            return None;
        }
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        Some(unsafe { CStr::from_ptr(self.name) })
    }

    /// The docstring, or `None` when the pointer is null.
    ///
    /// # Safety
    ///
    /// Same as [`name`](Self::name), for `doc`.
    pub unsafe fn doc(&self) -> Option<&CStr> {
        if self.doc.is_null() {
            return None;
        }
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        Some(unsafe { CStr::from_ptr(self.doc) })
    }

    /// Number of entries before the terminating null in `defines`.
    ///
    /// # Safety
    ///
    /// A non-null `defines` must point to a NULL-terminated pointer array.
    pub unsafe fn defines_len(&self) -> usize {
        if self.defines.is_null() {
            return 0;
        }
        let mut n = 0;
        // SAFETY: the array is NULL-terminated, so every read up to and
        // including the terminator is in bounds.
        while !unsafe { *self.defines.add(n) }.is_null() {
            n += 1;
        }
        n
    }
}

/// Check a wire-level spec with the same rules as [`validate`](crate::validate).
///
/// A null or empty name is [`ConfigError::EmptyName`].
///
/// # Safety
///
/// `raw.name`, if non-null, must point to a NUL-terminated string.
pub unsafe fn validate_raw(raw: &RawTypeSpec) -> Result<(), ConfigError> {
    // SAFETY: forwarded from the caller.
    let name = unsafe { raw.name() };
    if name.is_none_or(|n| n.is_empty()) {
        return Err(ConfigError::EmptyName);
    }
    check_sizes(raw.basicsize, raw.itemsize)?;
    if !raw.legacy_slots.is_null() && !raw.is_legacy() {
        return Err(ConfigError::LegacySlotsWithoutLegacyFlag);
    }
    Ok(())
}

impl RawSpecParam {
    pub fn to_param(self) -> Result<SpecParam, ConfigError> {
        Ok(SpecParam {
            kind: SpecParamKind::from_raw(self.kind)?,
            object: self.object,
        })
    }
}

impl From<SpecParam> for RawSpecParam {
    fn from(param: SpecParam) -> Self {
        Self {
            kind: param.kind.into(),
            object: param.object,
        }
    }
}

/// Read `len` parameters from a wire array; a null array means none.
///
/// # Safety
///
/// A non-null `ptr` must point to `len` initialized `RawSpecParam`s.
pub unsafe fn params_from_raw(
    ptr: *const RawSpecParam,
    len: usize,
) -> Result<Vec<SpecParam>, ConfigError> {
    if ptr.is_null() {
        return Ok(Vec::new());
    }
    // SAFETY: forwarded from the caller.
    let raw = unsafe { std::slice::from_raw_parts(ptr, len) };
    raw.iter().map(|p| p.to_param()).collect()
}

fn wire_enum<T: TryFrom<u32>>(raw: c_int) -> Option<T> {
    u32::try_from(raw).ok().and_then(|v| T::try_from(v).ok())
}

fn wire_int(v: u32) -> c_int {
    // every wire enum value is small
    v as c_int
}

/// Read an optional wire string.
///
/// # Safety
///
/// A non-null `p` must point to a NUL-terminated string.
unsafe fn read_str(p: *const c_char, field: &'static str) -> Result<Option<String>, ConfigError> {
    if p.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let s = unsafe { CStr::from_ptr(p) };
    s.to_str()
        .map(|s| Some(s.to_owned()))
        .map_err(|_| ConfigError::InvalidUtf8 { field })
}

impl RawDef {
    /// Decode this record; `index` is its position, used in errors.
    ///
    /// # Safety
    ///
    /// The payload field named by `kind` must be initialized, and its string
    /// pointers must be null or NUL-terminated.
    pub unsafe fn to_def(&self, index: usize) -> Result<Def, ConfigError> {
        let invalid = |reason| ConfigError::InvalidDef { index, reason };
        let kind = def_kind_from_raw(self.kind).ok_or(invalid("unknown definition kind"))?;

        // SAFETY (every union read below): `kind` names the active field.
        let def = match kind {
            DefKind::Slot => {
                let raw = unsafe { self.def.slot };
                Def::slot(
                    wire_enum::<SlotId>(raw.slot).ok_or(invalid("unknown slot"))?,
                    raw.func.ok_or(invalid("slot without a function"))?,
                )
            }
            DefKind::Method => {
                let raw = unsafe { self.def.meth };
                Def::Method(MethodDef {
                    name: unsafe { read_str(raw.name, "defines.name") }?
                        .ok_or(invalid("missing name"))?,
                    func: raw.func.ok_or(invalid("method without a function"))?,
                    signature: wire_enum::<FuncSignature>(raw.signature)
                        .ok_or(invalid("unknown method signature"))?,
                    doc: unsafe { read_str(raw.doc, "defines.doc") }?,
                })
            }
            DefKind::Member => {
                let raw = unsafe { self.def.member };
                Def::Member(MemberDef {
                    name: unsafe { read_str(raw.name, "defines.name") }?
                        .ok_or(invalid("missing name"))?,
                    kind: wire_enum::<MemberKind>(raw.kind).ok_or(invalid("unknown member kind"))?,
                    offset: raw.offset,
                    readonly: raw.readonly != 0,
                    doc: unsafe { read_str(raw.doc, "defines.doc") }?,
                })
            }
            DefKind::GetSet => {
                let raw = unsafe { self.def.getset };
                Def::GetSet(GetSetDef {
                    name: unsafe { read_str(raw.name, "defines.name") }?
                        .ok_or(invalid("missing name"))?,
                    getter: raw.getter,
                    setter: raw.setter,
                    doc: unsafe { read_str(raw.doc, "defines.doc") }?,
                })
            }
        };
        Ok(def)
    }
}

/// Decode the `defines` array of a wire spec.
///
/// # Safety
///
/// A non-null `raw.defines` must be a NULL-terminated array of pointers to
/// valid [`RawDef`] records (see [`RawDef::to_def`]).
pub unsafe fn defs_from_raw(raw: &RawTypeSpec) -> Result<Vec<Def>, ConfigError> {
    // SAFETY: forwarded from the caller.
    let len = unsafe { raw.defines_len() };
    (0..len)
        .map(|i| {
            // SAFETY: `i` is before the terminator and every entry is non-null.
            let def = unsafe { &**raw.defines.add(i) };
            unsafe { def.to_def(i) }
        })
        .collect()
}

impl TypeSpec {
    /// Read a wire spec, checking it with [`validate_raw`] first.
    ///
    /// # Safety
    ///
    /// Every string pointer in `raw` must be null or NUL-terminated, and
    /// `raw.defines` must satisfy [`defs_from_raw`].
    pub unsafe fn from_raw(raw: &RawTypeSpec) -> Result<Self, ConfigError> {
        // SAFETY: forwarded from the caller.
        unsafe { validate_raw(raw) }?;
        let name = unsafe { read_str(raw.name, "name") }?.ok_or(ConfigError::EmptyName)?;
        Ok(Self {
            name,
            basicsize: raw.basicsize,
            itemsize: raw.itemsize,
            flags: raw.flags(),
            legacy: raw.is_legacy(),
            legacy_slots: LegacySlots::new(raw.legacy_slots),
            defines: unsafe { defs_from_raw(raw) }?,
            doc: unsafe { read_str(raw.doc, "doc") }?,
        })
    }
}

/// Owned C strings whose buffers outlive the wire records pointing at them.
#[derive(Debug, Default)]
struct CStrings(Vec<CString>);

impl CStrings {
    fn push(&mut self, s: &str, field: &'static str) -> Result<*const c_char, ConfigError> {
        let c = CString::new(s).map_err(|_| ConfigError::NulInString { field })?;
        let p = c.as_ptr();
        self.0.push(c);
        Ok(p)
    }

    fn push_opt(&mut self, s: Option<&str>, field: &'static str) -> Result<*const c_char, ConfigError> {
        s.map_or(Ok(ptr::null()), |s| self.push(s, field))
    }
}

fn raw_def(def: &Def, strings: &mut CStrings) -> Result<RawDef, ConfigError> {
    let payload = match def {
        Def::Slot(d) => RawDefPayload {
            slot: RawSlot {
                slot: wire_int(d.slot.into()),
                func: Some(d.func),
            },
        },
        Def::Method(d) => RawDefPayload {
            meth: RawMeth {
                name: strings.push(&d.name, "defines.name")?,
                func: Some(d.func),
                signature: wire_int(d.signature.into()),
                doc: strings.push_opt(d.doc.as_deref(), "defines.doc")?,
            },
        },
        Def::Member(d) => RawDefPayload {
            member: RawMember {
                name: strings.push(&d.name, "defines.name")?,
                kind: wire_int(d.kind.into()),
                offset: d.offset,
                readonly: c_int::from(d.readonly),
                doc: strings.push_opt(d.doc.as_deref(), "defines.doc")?,
            },
        },
        Def::GetSet(d) => RawDefPayload {
            getset: RawGetSet {
                name: strings.push(&d.name, "defines.name")?,
                getter: d.getter,
                setter: d.setter,
                doc: strings.push_opt(d.doc.as_deref(), "defines.doc")?,
            },
        },
    };
    Ok(RawDef {
        kind: wire_int(def.kind().into()),
        def: payload,
    })
}

/// A [`RawTypeSpec`] together with the storage its pointers refer to.
///
/// The buffer owns copies of every string and definition record, so it does
/// not borrow the spec it was built from.
#[derive(Debug)]
pub struct RawTypeSpecBuf {
    raw: RawTypeSpec,
    _strings: CStrings,
    _defs: Vec<RawDef>,
    _defines: Vec<*const RawDef>,
}

impl RawTypeSpecBuf {
    pub fn as_raw(&self) -> &RawTypeSpec {
        &self.raw
    }

    pub fn as_ptr(&self) -> *const RawTypeSpec {
        &self.raw
    }
}

impl TypeSpec {
    /// Lay the spec out in wire form.
    pub fn to_raw(&self) -> Result<RawTypeSpecBuf, ConfigError> {
        let mut strings = CStrings::default();
        let name = strings.push(&self.name, "name")?;
        let doc = strings.push_opt(self.doc.as_deref(), "doc")?;

        let defs = self
            .defines
            .iter()
            .map(|d| raw_def(d, &mut strings))
            .collect::<Result<Vec<_>, _>>()?;
        let mut defines: Vec<*const RawDef> = defs.iter().map(ptr::from_ref).collect();
        defines.push(ptr::null());

        let raw = RawTypeSpec {
            name,
            basicsize: self.basicsize,
            itemsize: self.itemsize,
            flags: self.flags.bits(),
            legacy: c_int::from(self.legacy),
            legacy_slots: self.legacy_slots.map_or(ptr::null_mut(), |s| s.as_ptr()),
            defines: defines.as_ptr(),
            doc,
        };

        Ok(RawTypeSpecBuf {
            raw,
            _strings: strings,
            _defs: defs,
            _defines: defines,
        })
    }
}
