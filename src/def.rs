//! Definition records carried by a type specification.
//!
//! A spec's `defines` is an ordered list; a later definition replaces an
//! earlier one with the same [`DefKey`]. All numeric enum values below are
//! ABI.

use std::ffi::{c_int, c_uint};
use std::ptr;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Native entry point of a slot, method or accessor.
///
/// The real signature depends on the slot or [`FuncSignature`]; hosts cast it
/// before calling.
pub type CFunction = unsafe extern "C" fn();

/// Discriminant of a [`Def`] on the wire.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum DefKind {
    Slot = 1,
    Method = 2,
    Member = 3,
    GetSet = 4,
}

/// Host slot identifiers.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum SlotId {
    BfGetbuffer = 1,
    BfReleasebuffer = 2,
    MpAssSubscript = 3,
    MpLength = 4,
    MpSubscript = 5,
    NbAbsolute = 6,
    NbAdd = 7,
    NbAnd = 8,
    NbBool = 9,
    NbDivmod = 10,
    NbFloat = 11,
    NbFloorDivide = 12,
    NbIndex = 13,
    NbInplaceAdd = 14,
    NbInplaceAnd = 15,
    NbInplaceFloorDivide = 16,
    NbInplaceLshift = 17,
    NbInplaceMultiply = 18,
    NbInplaceOr = 19,
    NbInplacePower = 20,
    NbInplaceRemainder = 21,
    NbInplaceRshift = 22,
    NbInplaceSubtract = 23,
    NbInplaceTrueDivide = 24,
    NbInplaceXor = 25,
    NbInt = 26,
    NbInvert = 27,
    NbLshift = 28,
    NbMultiply = 29,
    NbNegative = 30,
    NbOr = 31,
    NbPositive = 32,
    NbPower = 33,
    NbRemainder = 34,
    NbRshift = 35,
    NbSubtract = 36,
    NbTrueDivide = 37,
    NbXor = 38,
    SqAssItem = 39,
    SqConcat = 40,
    SqContains = 41,
    SqInplaceConcat = 42,
    SqInplaceRepeat = 43,
    SqItem = 44,
    SqLength = 45,
    SqRepeat = 46,
    TpInit = 60,
    TpNew = 65,
    TpRepr = 66,
    TpRichcompare = 67,
    TpTraverse = 71,
    NbMatrixMultiply = 75,
    NbInplaceMatrixMultiply = 76,
    TpFinalize = 80,
    TpDestroy = 1000,
}

/// Calling convention of a method definition.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum FuncSignature {
    VarArgs = 1,
    Keywords = 2,
    NoArgs = 3,
    O = 4,
}

/// Field type of a member definition.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum MemberKind {
    Short = 0,
    Int = 1,
    Long = 2,
    Float = 3,
    Double = 4,
    String = 5,
    Object = 6,
    Char = 7,
    Byte = 8,
    UByte = 9,
    UShort = 10,
    UInt = 11,
    ULong = 12,
    StringInPlace = 13,
    Bool = 14,
    ObjectEx = 16,
    LongLong = 17,
    ULongLong = 18,
    SSizeT = 19,
    None = 20,
}

/// A slot implementation.
#[derive(Debug, Clone, Copy)]
pub struct SlotDef {
    pub slot: SlotId,
    pub func: CFunction,
}

/// A named method.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub func: CFunction,
    pub signature: FuncSignature,
    pub doc: Option<String>,
}

/// A struct field exposed as an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDef {
    pub name: String,
    pub kind: MemberKind,
    /// Byte offset into the instance struct.
    pub offset: isize,
    pub readonly: bool,
    pub doc: Option<String>,
}

/// A computed attribute.
#[derive(Debug, Clone)]
pub struct GetSetDef {
    pub name: String,
    pub getter: Option<CFunction>,
    pub setter: Option<CFunction>,
    pub doc: Option<String>,
}

// Entry points compare by address. Identical function bodies may or may not
// share one, so equal behaviour does not imply equal definitions.
fn same_fn(a: CFunction, b: CFunction) -> bool {
    ptr::fn_addr_eq(a, b)
}

fn same_opt_fn(a: Option<CFunction>, b: Option<CFunction>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_fn(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for SlotDef {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && same_fn(self.func, other.func)
    }
}

impl Eq for SlotDef {}

impl PartialEq for MethodDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.signature == other.signature
            && self.doc == other.doc
            && same_fn(self.func, other.func)
    }
}

impl Eq for MethodDef {}

impl PartialEq for GetSetDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.doc == other.doc
            && same_opt_fn(self.getter, other.getter)
            && same_opt_fn(self.setter, other.setter)
    }
}

impl Eq for GetSetDef {}

/// One entry of a spec's `defines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Def {
    Slot(SlotDef),
    Method(MethodDef),
    Member(MemberDef),
    GetSet(GetSetDef),
}

/// Identity used when a later definition overrides an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DefKey {
    Slot(SlotId),
    Attr(String),
}

impl Def {
    /// Create a slot definition.
    pub fn slot(slot: SlotId, func: CFunction) -> Self {
        Def::Slot(SlotDef { slot, func })
    }

    /// Create a method definition without a docstring.
    pub fn method(name: impl Into<String>, signature: FuncSignature, func: CFunction) -> Self {
        Def::Method(MethodDef {
            name: name.into(),
            func,
            signature,
            doc: None,
        })
    }

    /// Create a member definition.
    pub fn member(name: impl Into<String>, kind: MemberKind, offset: isize, readonly: bool) -> Self {
        Def::Member(MemberDef {
            name: name.into(),
            kind,
            offset,
            readonly,
            doc: None,
        })
    }

    /// Create a get/set definition.
    pub fn getset(
        name: impl Into<String>,
        getter: Option<CFunction>,
        setter: Option<CFunction>,
    ) -> Self {
        Def::GetSet(GetSetDef {
            name: name.into(),
            getter,
            setter,
            doc: None,
        })
    }

    pub fn kind(&self) -> DefKind {
        match self {
            Def::Slot(_) => DefKind::Slot,
            Def::Method(_) => DefKind::Method,
            Def::Member(_) => DefKind::Member,
            Def::GetSet(_) => DefKind::GetSet,
        }
    }

    /// The identity this definition overrides.
    ///
    /// Methods, members and get/sets share one attribute namespace.
    pub fn key(&self) -> DefKey {
        match self {
            Def::Slot(s) => DefKey::Slot(s.slot),
            Def::Method(m) => DefKey::Attr(m.name.clone()),
            Def::Member(m) => DefKey::Attr(m.name.clone()),
            Def::GetSet(g) => DefKey::Attr(g.name.clone()),
        }
    }

    /// The attribute name, if this definition binds one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Def::Slot(_) => None,
            Def::Method(m) => Some(&m.name),
            Def::Member(m) => Some(&m.name),
            Def::GetSet(g) => Some(&g.name),
        }
    }
}

/// Read a wire-level def kind.
pub fn def_kind_from_raw(raw: c_int) -> Option<DefKind> {
    c_uint::try_from(raw).ok().and_then(|v| DefKind::try_from(v).ok())
}
