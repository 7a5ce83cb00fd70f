//! Attribute parsing for the derive.

use syn::punctuated::Punctuated;
use syn::{Attribute, Meta, Token};

/// Layout mode selected by `#[univtype(...)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutAttr {
    #[default]
    Pure,
    Legacy,
}

/// Parsed `#[univtype(...)]` attributes on a struct.
#[derive(Debug, Default)]
pub struct TypeAttrs {
    pub layout: Option<LayoutAttr>,
}

impl TypeAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("univtype") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                let layout = if meta.path.is_ident("legacy") {
                    LayoutAttr::Legacy
                } else if meta.path.is_ident("pure") {
                    LayoutAttr::Pure
                } else {
                    return Err(meta.error(format!(
                        "unknown univtype attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                };
                match result.layout {
                    Some(prev) if prev != layout => {
                        Err(meta.error("`legacy` and `pure` are mutually exclusive"))
                    }
                    _ => {
                        result.layout = Some(layout);
                        Ok(())
                    }
                }
            })?;
        }

        Ok(result)
    }

    pub fn is_legacy(&self) -> bool {
        self.layout.unwrap_or_default() == LayoutAttr::Legacy
    }
}

/// Whether the item carries `#[repr(C)]`, possibly among other hints.
pub fn has_repr_c(attrs: &[Attribute]) -> syn::Result<bool> {
    for attr in attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        let hints = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        if hints.iter().any(|m| m.path().is_ident("C")) {
            return Ok(true);
        }
    }
    Ok(false)
}
