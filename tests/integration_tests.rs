//! End-to-end tests: specs registered with the reference host and read back
//! through accessors.

use std::ptr;

use univtype::abi::{RawSpecParam, params_from_raw, validate_raw};
use univtype::prelude::*;
use univtype::{BuiltinType, GcMode, HostConfig, LegacySlots, TypeInfo, default_flags};

unsafe extern "C" fn traverse() {}

static SLOT_TABLE: u8 = 0;

fn slot_table() -> LegacySlots {
    LegacySlots::new(ptr::from_ref(&SLOT_TABLE).cast_mut().cast()).unwrap()
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl TypeStruct for Point {
    const IS_LEGACY: bool = false;
    const ACCESSOR: Accessor<Self> = Accessor::pure();
}

fn point_spec() -> TypeSpec {
    TypeSpec {
        name: "Point".into(),
        basicsize: 16,
        itemsize: 0,
        flags: default_flags(),
        legacy: false,
        legacy_slots: None,
        defines: vec![],
        doc: None,
    }
}

#[test]
fn test_point_end_to_end() {
    let spec = point_spec();
    assert_eq!(spec.validate(), Ok(()));
    assert_eq!(univtype::resolve_legacy(&spec, None), Ok(false));

    let mut host = LocalHost::default();
    let ty = host.type_from_spec(&spec, &[]).unwrap();
    let obj = host.new_instance(ty, 0).unwrap();

    let p = Point::from_handle(&host, obj);
    assert!(!p.is_null());
    unsafe {
        assert_eq!(*p, Point { x: 0.0, y: 0.0 }, "instances start zeroed");
        (*p).x = 3.0;
        (*p).y = 4.0;
    }

    let again = Point::checked_from_handle(&host, obj, ty).unwrap();
    assert_eq!(unsafe { *again.as_ptr() }, Point { x: 3.0, y: 4.0 });
}

#[test]
fn test_point_with_legacy_slots_rejected() {
    let mut spec = point_spec();
    spec.legacy_slots = Some(slot_table());
    assert_eq!(
        spec.validate(),
        Err(ConfigError::LegacySlotsWithoutLegacyFlag)
    );

    let mut host = LocalHost::default();
    assert_eq!(
        host.type_from_spec(&spec, &[]),
        Err(HostError::Config(ConfigError::LegacySlotsWithoutLegacyFlag))
    );
    assert!(host.lookup_type("Point").is_none());
}

#[test]
fn test_wire_spec_matches_validation() {
    let mut spec = point_spec();
    let buf = spec.to_raw().unwrap();
    assert_eq!(unsafe { validate_raw(buf.as_raw()) }, Ok(()));

    spec.legacy_slots = Some(slot_table());
    let buf = spec.to_raw().unwrap();
    assert_eq!(
        unsafe { validate_raw(buf.as_raw()) },
        Err(ConfigError::LegacySlotsWithoutLegacyFlag)
    );
}

#[test]
fn test_wire_params_register_subtype() {
    let mut host = LocalHost::default();
    let base_spec = TypeSpec::builder("geo.Shape")
        .basicsize(8)
        .flags(TypeFlags::BASE_TYPE)
        .build()
        .unwrap();
    let base = host.type_from_spec(&base_spec, &[]).unwrap();

    let raw = [RawSpecParam::from(SpecParam::base(base))];
    let params = unsafe { params_from_raw(raw.as_ptr(), raw.len()) }.unwrap();
    let sub = host
        .type_from_spec(&TypeSpec::new("geo.Circle"), &params)
        .unwrap();
    assert!(host.is_subtype(sub, base));
}

#[test]
fn test_module_qualified_names() {
    let mut host = LocalHost::default();
    let ty = host
        .type_from_spec(&TypeSpec::new("geometry.shapes.Point"), &[])
        .unwrap();
    let info: TypeInfo = host.type_info(ty).unwrap();
    assert_eq!(info.module.as_deref(), Some("geometry"));
    assert_eq!(info.name, "shapes.Point");
    assert!(!info.builtin);
    assert!(info.flags.contains(TypeFlags::HEAP_ALLOCATED));
}

#[test]
fn test_duplicate_name_rejected() {
    let mut host = LocalHost::default();
    host.type_from_spec(&TypeSpec::new("geo.Point"), &[]).unwrap();

    assert_eq!(
        host.type_from_spec(&TypeSpec::new("geo.Point"), &[]),
        Err(HostError::DuplicateTypeName {
            name: "geo.Point".into()
        })
    );
    // same type name in another module is a different type
    assert!(host.type_from_spec(&TypeSpec::new("other.Point"), &[]).is_ok());
}

#[test]
fn test_final_base_rejected() {
    let mut host = LocalHost::default();
    let sealed = host
        .type_from_spec(&TypeSpec::new("Sealed"), &[])
        .unwrap();
    assert_eq!(
        host.type_from_spec(&TypeSpec::new("Child"), &[SpecParam::base(sealed)]),
        Err(HostError::BaseNotSubclassable {
            base: "Sealed".into()
        })
    );
}

#[test]
fn test_gc_type_needs_traverse_on_refcounting_host() {
    let gc_spec = || {
        TypeSpec::builder("Node")
            .basicsize(24)
            .flags(TypeFlags::GARBAGE_COLLECTED)
    };

    let mut host = LocalHost::default();
    assert_eq!(host.gc_mode(), GcMode::RefCounting);
    assert_eq!(
        host.type_from_spec(&gc_spec().build().unwrap(), &[]),
        Err(HostError::Config(ConfigError::MissingTraverse))
    );
    let with_traverse = gc_spec()
        .define(Def::slot(SlotId::TpTraverse, traverse))
        .build()
        .unwrap();
    assert!(host.type_from_spec(&with_traverse, &[]).is_ok());

    let mut tracing_host =
        LocalHost::new(HostConfig::default().with_gc_mode(GcMode::Tracing)).unwrap();
    assert!(tracing_host.type_from_spec(&gc_spec().build().unwrap(), &[]).is_ok());
}

#[test]
fn test_pure_struct_over_legacy_builtin() {
    let mut host = LocalHost::default();
    let tuple = host.tuple_type();

    let own_struct = TypeSpec::builder("Pair").basicsize(40).build().unwrap();
    assert_eq!(
        host.type_from_spec(&own_struct, &[SpecParam::base(tuple)]),
        Err(HostError::Config(ConfigError::UnsupportedPureOverLegacyBase))
    );

    // reusing the builtin's struct makes the subtype legacy
    let reuse = TypeSpec::new("Pair");
    let ty = host.type_from_spec(&reuse, &[SpecParam::base(tuple)]).unwrap();
    let info = host.type_info(ty).unwrap();
    assert!(info.legacy);
    assert_eq!(info.basicsize, 24);
    assert_eq!(info.itemsize, 8);
}

#[test]
fn test_legacy_over_pure_extension_rejected() {
    let mut host = LocalHost::default();
    let base = host
        .type_from_spec(
            &TypeSpec::builder("Base")
                .basicsize(16)
                .flags(TypeFlags::BASE_TYPE)
                .build()
                .unwrap(),
            &[],
        )
        .unwrap();
    let spec = TypeSpec::builder("Sub")
        .basicsize(32)
        .legacy(true)
        .build()
        .unwrap();
    assert_eq!(
        host.type_from_spec(&spec, &[SpecParam::base(base)]),
        Err(HostError::Config(ConfigError::LegacyOverPureBase))
    );
}

#[test]
fn test_bases_tuple_takes_precedence() {
    let mut host = LocalHost::default();
    let mixin = |name: &str| {
        TypeSpec::builder(name)
            .flags(TypeFlags::BASE_TYPE)
            .build()
            .unwrap()
    };
    let a = host.type_from_spec(&mixin("A"), &[]).unwrap();
    let b = host.type_from_spec(&mixin("B"), &[]).unwrap();
    let c = host.type_from_spec(&mixin("C"), &[]).unwrap();
    let bases = host.new_tuple(vec![a, b]);

    let ty = host
        .type_from_spec(
            &TypeSpec::new("AB"),
            &[SpecParam::base(c), SpecParam::bases_tuple(bases)],
        )
        .unwrap();
    assert!(host.is_subtype(ty, a));
    assert!(host.is_subtype(ty, b));
    assert!(!host.is_subtype(ty, c), "Base is ignored when a tuple is given");
    assert_eq!(host.registered_type(ty).unwrap().bases, vec![a, b]);
}

#[test]
fn test_duplicate_params_rejected_by_host() {
    let mut host = LocalHost::default();
    let object = host.object_type();
    assert_eq!(
        host.type_from_spec(
            &TypeSpec::new("T"),
            &[SpecParam::base(object), SpecParam::base(object)]
        ),
        Err(HostError::Config(ConfigError::DuplicateSpecParamKind(
            univtype::SpecParamKind::Base
        )))
    );
}

#[test]
fn test_checked_accessor_errors() {
    let mut host = LocalHost::default();
    let small = host
        .type_from_spec(&TypeSpec::builder("Small").basicsize(8).build().unwrap(), &[])
        .unwrap();
    let point = host.type_from_spec(&point_spec(), &[]).unwrap();
    let obj = host.new_instance(small, 0).unwrap();

    assert!(matches!(
        Point::checked_from_handle(&host, obj, small),
        Err(AccessError::TypeMismatch { .. })
    ));
    assert!(matches!(
        Point::checked_from_handle(&host, obj, point),
        Err(AccessError::TypeMismatch { .. })
    ));

    host.release(obj);
    assert_eq!(
        Point::checked_from_handle(&host, obj, small),
        Err(AccessError::UnknownHandle(obj))
    );
}

#[test]
fn test_custom_builtin_base() {
    let config = HostConfig::default().with_builtin(
        BuiltinType::new("Exception")
            .basicsize(32)
            .flags(TypeFlags::BASE_TYPE)
            .legacy(true),
    );
    let mut host = LocalHost::new(config).unwrap();
    let exc = host.lookup_type("Exception").unwrap();

    let spec = TypeSpec::builder("MyError")
        .basicsize(48)
        .legacy(true)
        .legacy_slots(slot_table())
        .build()
        .unwrap();
    let ty = host.type_from_spec(&spec, &[SpecParam::base(exc)]).unwrap();
    let obj = host.new_instance(ty, 0).unwrap();

    assert_eq!(host.as_struct(obj), host.as_struct_legacy(obj));
    let head = host.as_struct_legacy(obj).cast::<ObjectHead>();
    assert_eq!(unsafe { (*head).ob_type }, ty);
}

fn host_with_exception() -> (LocalHost, Handle) {
    let config = HostConfig::default().with_builtin(
        BuiltinType::new("Exception")
            .basicsize(32)
            .flags(TypeFlags::BASE_TYPE)
            .legacy(true),
    );
    let host = LocalHost::new(config).unwrap();
    let exc = host.lookup_type("Exception").unwrap();
    (host, exc)
}

#[test]
fn test_bases_tuple_order_does_not_change_layout_checks() {
    let (mut host, exc) = host_with_exception();
    let pure_base = host
        .type_from_spec(
            &TypeSpec::builder("PureBase")
                .basicsize(16)
                .flags(TypeFlags::BASE_TYPE)
                .build()
                .unwrap(),
            &[],
        )
        .unwrap();
    let spec = TypeSpec::builder("Mixed").basicsize(48).build().unwrap();

    for items in [vec![pure_base, exc], vec![exc, pure_base]] {
        let bases = host.new_tuple(items.clone());
        assert_eq!(
            host.type_from_spec(&spec, &[SpecParam::bases_tuple(bases)]),
            Err(HostError::Config(ConfigError::UnsupportedPureOverLegacyBase)),
            "bases {items:?}"
        );
    }
    assert!(host.lookup_type("Mixed").is_none());
}

#[test]
fn test_bases_tuple_inherits_largest_struct() {
    let (mut host, exc) = host_with_exception();
    let legacy_ext = host
        .type_from_spec(
            &TypeSpec::builder("Wide")
                .basicsize(40)
                .itemsize(8)
                .legacy(true)
                .flags(TypeFlags::BASE_TYPE)
                .build()
                .unwrap(),
            &[],
        )
        .unwrap();

    for (name, items) in [("AB", vec![exc, legacy_ext]), ("BA", vec![legacy_ext, exc])] {
        let bases = host.new_tuple(items);
        let ty = host
            .type_from_spec(&TypeSpec::new(name), &[SpecParam::bases_tuple(bases)])
            .unwrap();
        let info = host.type_info(ty).unwrap();
        assert!(info.legacy);
        assert_eq!((info.basicsize, info.itemsize), (40, 8));
    }
}

#[test]
fn test_bases_with_conflicting_modes_need_own_struct() {
    let mut host = LocalHost::default();
    let mut base = |name: &str, legacy: bool| {
        let spec = TypeSpec::builder(name)
            .basicsize(16)
            .legacy(legacy)
            .flags(TypeFlags::BASE_TYPE)
            .build()
            .unwrap();
        host.type_from_spec(&spec, &[]).unwrap()
    };
    let pure = base("P", false);
    let legacy = base("L", true);
    let bases = host.new_tuple(vec![pure, legacy]);

    assert_eq!(
        host.type_from_spec(&TypeSpec::new("PL"), &[SpecParam::bases_tuple(bases)]),
        Err(HostError::Config(ConfigError::IncompatibleBaseLayouts))
    );
    let own = TypeSpec::builder("PL").basicsize(32).build().unwrap();
    let ty = host
        .type_from_spec(&own, &[SpecParam::bases_tuple(bases)])
        .unwrap();
    assert!(!host.type_info(ty).unwrap().legacy);
}

#[test]
fn test_release_everything() {
    let mut host = LocalHost::default();
    let baseline = host.live_objects();

    let base = host
        .type_from_spec(
            &TypeSpec::builder("Base")
                .basicsize(16)
                .flags(TypeFlags::BASE_TYPE)
                .build()
                .unwrap(),
            &[],
        )
        .unwrap();
    let bases = host.new_tuple(vec![base]);
    let sub = host
        .type_from_spec(&TypeSpec::new("Sub"), &[SpecParam::bases_tuple(bases)])
        .unwrap();
    let obj = host.new_instance(sub, 0).unwrap();

    for h in [bases, base, sub, obj] {
        assert!(host.release(h));
    }
    assert_eq!(host.live_objects(), baseline);
    assert!(host.lookup_type("Base").is_none());
    assert!(host.lookup_type("Sub").is_none());
}
