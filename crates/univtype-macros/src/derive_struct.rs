//! Implementation of `#[derive(TypeStruct)]`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Type, parse_macro_input};

use crate::attrs::{TypeAttrs, has_repr_c};

pub fn derive_type_struct_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_type_struct_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_type_struct_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = TypeAttrs::from_attrs(&input.attrs)?;

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "TypeStruct can only be derived for structs",
        ));
    };

    if !has_repr_c(&input.attrs)? {
        return Err(syn::Error::new_spanned(
            name,
            "TypeStruct requires #[repr(C)]",
        ));
    }

    let is_legacy = attrs.is_legacy();
    if is_legacy {
        check_header_field(&data.fields, name)?;
    }

    let accessor = if is_legacy {
        quote! { ::univtype::Accessor::legacy() }
    } else {
        quote! { ::univtype::Accessor::pure() }
    };
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::univtype::TypeStruct for #name #ty_generics #where_clause {
            const IS_LEGACY: bool = #is_legacy;
            const ACCESSOR: ::univtype::Accessor<Self> = #accessor;
        }
    })
}

/// A legacy struct must begin with the host header.
fn check_header_field(fields: &Fields, name: &syn::Ident) -> syn::Result<()> {
    let Some(first) = fields.iter().next() else {
        return Err(syn::Error::new_spanned(
            name,
            "a legacy TypeStruct must start with an ObjectHead field",
        ));
    };
    if !is_object_head(&first.ty) {
        return Err(syn::Error::new(
            first.ty.span(),
            "the first field of a legacy TypeStruct must be ObjectHead",
        ));
    }
    Ok(())
}

fn is_object_head(ty: &Type) -> bool {
    match ty {
        Type::Path(p) => p
            .path
            .segments
            .last()
            .is_some_and(|seg| seg.ident == "ObjectHead" && seg.arguments.is_empty()),
        _ => false,
    }
}
