//! Spec parameters: explicit inheritance for a type-creation call.

use std::ffi::c_int;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{ConfigError, Context, Handle};

/// What a [`SpecParam`] refers to. Values are ABI.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum SpecParamKind {
    /// A single base type.
    Base = 1,
    /// A tuple of base types.
    BasesTuple = 2,
}

/// A transient parameter of one type-creation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecParam {
    pub kind: SpecParamKind,
    pub object: Handle,
}

impl SpecParam {
    pub fn base(ty: Handle) -> Self {
        Self {
            kind: SpecParamKind::Base,
            object: ty,
        }
    }

    pub fn bases_tuple(tuple: Handle) -> Self {
        Self {
            kind: SpecParamKind::BasesTuple,
            object: tuple,
        }
    }
}

impl SpecParamKind {
    /// Read a wire-level kind.
    pub fn from_raw(raw: c_int) -> Result<Self, ConfigError> {
        Self::try_from(raw).map_err(|_| ConfigError::UnknownSpecParamKind(raw))
    }
}

/// Check the shape of a parameter list.
///
/// At most one parameter of each kind; a `Base` must refer to a type and a
/// `BasesTuple` to a tuple whose items are all types. One `Base` together
/// with one `BasesTuple` is accepted.
pub fn validate_params<C: Context + ?Sized>(params: &[SpecParam], ctx: &C) -> Result<(), ConfigError> {
    let mut seen_base = false;
    let mut seen_tuple = false;

    for param in params {
        let seen = match param.kind {
            SpecParamKind::Base => &mut seen_base,
            SpecParamKind::BasesTuple => &mut seen_tuple,
        };
        if *seen {
            return Err(ConfigError::DuplicateSpecParamKind(param.kind));
        }
        *seen = true;

        match param.kind {
            SpecParamKind::Base => {
                if !ctx.is_type(param.object) {
                    return Err(ConfigError::InvalidSpecParamTarget {
                        kind: param.kind,
                        expected: "a type",
                    });
                }
            }
            SpecParamKind::BasesTuple => {
                let all_types = ctx
                    .tuple_items(param.object)
                    .is_some_and(|items| items.iter().all(|h| ctx.is_type(*h)));
                if !all_types {
                    return Err(ConfigError::InvalidSpecParamTarget {
                        kind: param.kind,
                        expected: "a tuple of types",
                    });
                }
            }
        }
    }

    Ok(())
}

/// Compute the ordered base list for validated parameters.
///
/// An empty result means "inherit from the universal base object type". A
/// `BasesTuple` takes precedence; a `Base` given alongside it is ignored.
pub fn resolve_bases<C: Context + ?Sized>(
    params: &[SpecParam],
    ctx: &C,
) -> Result<Vec<Handle>, ConfigError> {
    if let Some(tuple) = params.iter().find(|p| p.kind == SpecParamKind::BasesTuple) {
        if params.iter().any(|p| p.kind == SpecParamKind::Base) {
            tracing::warn!(
                tuple = %tuple.object,
                "spec parameter Base ignored because a BasesTuple was given"
            );
        }
        return ctx
            .tuple_items(tuple.object)
            .ok_or(ConfigError::InvalidSpecParamTarget {
                kind: SpecParamKind::BasesTuple,
                expected: "a tuple of types",
            });
    }

    Ok(params
        .iter()
        .filter(|p| p.kind == SpecParamKind::Base)
        .map(|p| p.object)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalHost;

    fn host_with_types() -> (LocalHost, Handle, Handle) {
        let mut host = LocalHost::default();
        let object = host.object_type();
        let tuple = host.new_tuple(vec![object]);
        (host, object, tuple)
    }

    #[test]
    fn empty_params_are_valid() {
        let (host, _, _) = host_with_types();
        assert_eq!(validate_params(&[], &host), Ok(()));
        assert_eq!(resolve_bases(&[], &host), Ok(vec![]));
    }

    #[test]
    fn two_bases_rejected() {
        let (host, object, _) = host_with_types();
        let params = [SpecParam::base(object), SpecParam::base(object)];
        assert_eq!(
            validate_params(&params, &host),
            Err(ConfigError::DuplicateSpecParamKind(SpecParamKind::Base))
        );
    }

    #[test]
    fn two_tuples_rejected() {
        let (host, _, tuple) = host_with_types();
        let params = [SpecParam::bases_tuple(tuple), SpecParam::bases_tuple(tuple)];
        assert_eq!(
            validate_params(&params, &host),
            Err(ConfigError::DuplicateSpecParamKind(SpecParamKind::BasesTuple))
        );
    }

    #[test]
    fn base_and_tuple_accepted_tuple_wins() {
        let (mut host, object, _) = host_with_types();
        let other = host.new_tuple(vec![]);
        let tuple = host.new_tuple(vec![object]);
        let params = [SpecParam::base(object), SpecParam::bases_tuple(tuple)];
        assert_eq!(validate_params(&params, &host), Ok(()));
        assert_eq!(resolve_bases(&params, &host), Ok(vec![object]));
        // a tuple that is not a type is still rejected as a Base
        let bad = [SpecParam::base(other)];
        assert!(matches!(
            validate_params(&bad, &host),
            Err(ConfigError::InvalidSpecParamTarget {
                kind: SpecParamKind::Base,
                ..
            })
        ));
    }

    #[test]
    fn tuple_param_must_hold_types() {
        let (mut host, object, _) = host_with_types();
        let inner = host.new_tuple(vec![]);
        let mixed = host.new_tuple(vec![object, inner]);
        assert!(matches!(
            validate_params(&[SpecParam::bases_tuple(mixed)], &host),
            Err(ConfigError::InvalidSpecParamTarget {
                kind: SpecParamKind::BasesTuple,
                ..
            })
        ));
        assert!(matches!(
            validate_params(&[SpecParam::bases_tuple(object)], &host),
            Err(ConfigError::InvalidSpecParamTarget { .. })
        ));
    }

    #[test]
    fn null_base_rejected() {
        let (host, _, _) = host_with_types();
        assert!(validate_params(&[SpecParam::base(Handle::NULL)], &host).is_err());
    }

    #[test]
    fn raw_kind() {
        assert_eq!(SpecParamKind::from_raw(1), Ok(SpecParamKind::Base));
        assert_eq!(SpecParamKind::from_raw(2), Ok(SpecParamKind::BasesTuple));
        assert_eq!(
            SpecParamKind::from_raw(3),
            Err(ConfigError::UnknownSpecParamKind(3))
        );
    }
}
