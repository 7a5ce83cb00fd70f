//! Legacy/pure layout resolution.
//!
//! A *legacy* type's instance struct begins with the host's object header; a
//! *pure* type's struct has no host-owned bytes at all. Whether a new type is
//! legacy depends on what it asks for, whether it declares a struct of its
//! own, and what its base is. [`resolve_layout`] is the only place that rule
//! lives; hosts must call it instead of re-deriving the decision.
//!
//! | own struct | base                     | requested | result                           |
//! |------------|--------------------------|-----------|----------------------------------|
//! | any        | universal object         | `l`       | `l`                              |
//! | no         | any, legacy `b`          | any       | `b` (forced)                     |
//! | yes        | builtin, legacy          | pure      | `UnsupportedPureOverLegacyBase`  |
//! | yes        | extension type, pure     | legacy    | `LegacyOverPureBase`             |
//! | yes        | otherwise                | `l`       | `l`                              |
//!
//! Legacy slots are rejected whenever the result is pure.
//!
//! With several bases, [`resolve_layout_over`] applies the table to each of
//! them. Any rejection wins and the bases must agree on the result, so the
//! outcome does not depend on the order the bases were listed in.

use crate::{ConfigError, TypeSpec};

/// What the resolver needs to know about a base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseLayout {
    /// The base's instances begin with the host header.
    pub legacy: bool,
    /// The base is provided by the host rather than built from a spec.
    pub builtin: bool,
}

impl BaseLayout {
    /// A base built from a spec.
    pub const fn extension(legacy: bool) -> Self {
        Self {
            legacy,
            builtin: false,
        }
    }

    /// A host-provided base.
    pub const fn builtin(legacy: bool) -> Self {
        Self {
            legacy,
            builtin: true,
        }
    }
}

/// Resolve the layout mode for a spec whose base, if any, is an extension type.
///
/// `None` means the base is the universal object type.
pub fn resolve_legacy(spec: &TypeSpec, base_legacy: Option<bool>) -> Result<bool, ConfigError> {
    resolve_layout(spec, base_legacy.map(BaseLayout::extension))
}

/// Resolve the layout mode of `spec` over `base`.
///
/// `None` means the base is the universal object type.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve_layout(spec: &TypeSpec, base: Option<BaseLayout>) -> Result<bool, ConfigError> {
    let has_slots = spec.legacy_slots.is_some();
    if has_slots && !spec.legacy {
        return Err(ConfigError::LegacySlotsWithoutLegacyFlag);
    }

    let Some(base) = base else {
        return Ok(spec.legacy);
    };

    let legacy = if !spec.declares_struct() {
        // Reusing the base's memory means reusing its header interpretation.
        if base.legacy != spec.legacy {
            tracing::trace!(
                name = %spec.name,
                requested = spec.legacy,
                forced = base.legacy,
                "layout mode inherited from base"
            );
        }
        base.legacy
    } else if !spec.legacy && base.legacy && base.builtin {
        return Err(ConfigError::UnsupportedPureOverLegacyBase);
    } else if spec.legacy && !base.legacy && !base.builtin {
        return Err(ConfigError::LegacyOverPureBase);
    } else {
        spec.legacy
    };

    if has_slots && !legacy {
        return Err(ConfigError::LegacySlotsWithoutLegacyFlag);
    }
    Ok(legacy)
}

/// Resolve the layout mode of `spec` over every base in `bases`.
///
/// An empty slice means the universal object type. Bases are checked
/// legacy builtins first, so the error reported for a set of bases is the
/// same whatever order they were given in.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve_layout_over(spec: &TypeSpec, bases: &[BaseLayout]) -> Result<bool, ConfigError> {
    let mut ordered = bases.to_vec();
    ordered.sort_unstable_by_key(|b| (!b.builtin, !b.legacy));
    ordered.dedup();

    let mut resolved = None;
    for base in ordered {
        let legacy = resolve_layout(spec, Some(base))?;
        match resolved {
            Some(prev) if prev != legacy => return Err(ConfigError::IncompatibleBaseLayouts),
            _ => resolved = Some(legacy),
        }
    }
    match resolved {
        Some(legacy) => Ok(legacy),
        None => resolve_layout(spec, None),
    }
}
