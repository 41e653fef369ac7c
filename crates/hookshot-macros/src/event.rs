//! `#[derive(Event)]` implementation.
//!
//! # Struct attribute `#[event(...)]`
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `type` | `"process:before"` | No | Event type (default: the struct path, e.g. `app.billing.SaveEvent`) |
//!
//! # Field attribute `#[event(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `base` | Marks the `EventBase` field. Optional when a field's type is named `EventBase` |
//!
//! Payload fields may not use the names of the structural event properties
//! (`sender`, `target`, `stopped`, `chain`, `used`, `used_by`).

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Field, Fields, Type, spanned::Spanned};

const RESERVED: [&str; 6] = ["sender", "target", "stopped", "chain", "used", "used_by"];

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<Option<syn::LitStr>> {
    let mut event_type = None;

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type") {
                let lit = meta.value()?.parse::<syn::LitStr>()?;
                if lit.value().is_empty() || lit.value().contains("::") {
                    return Err(syn::Error::new(
                        lit.span(),
                        "event types must be non-empty and must not contain `::`",
                    ));
                }
                event_type = Some(lit);
                Ok(())
            } else {
                Err(meta.error("unknown event attribute, expected `type`"))
            }
        })?;
    }

    Ok(event_type)
}

fn is_marked_base(field: &Field) -> syn::Result<bool> {
    let mut marked = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("base") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute, expected `base`"))
            }
        })?;
    }
    Ok(marked)
}

fn is_event_base_type(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "EventBase"),
        _ => false,
    }
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_event(input: &DeriveInput) -> syn::Result<TokenStream> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "Event can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "Event can only be derived for structs",
            ));
        }
    };

    let event_type = parse_struct_attrs(&input.attrs)?;

    let mut marked = None;
    let mut by_type = None;
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if is_marked_base(field)? {
            if marked.is_some() {
                return Err(syn::Error::new(
                    ident.span(),
                    "only one field can be marked with #[event(base)]",
                ));
            }
            marked = Some(ident);
        } else if by_type.is_none() && is_event_base_type(&field.ty) {
            by_type = Some(ident);
        }
    }
    let base = marked.or(by_type).ok_or_else(|| {
        syn::Error::new(
            input.ident.span(),
            "Event requires an `EventBase` field, mark it with #[event(base)]",
        )
    })?;

    for ident in fields.iter().filter_map(|field| field.ident.as_ref()) {
        if ident != base && RESERVED.contains(&ident.to_string().as_str()) {
            return Err(syn::Error::new(
                ident.span(),
                format!("`{ident}` is a reserved event property"),
            ));
        }
    }

    let name = &input.ident;
    let declared_type = event_type.map(|event_type| {
        quote! {
            fn declared_type() -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(#event_type)
            }
        }
    });
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::hookshot_core::Event for #name #ty_generics #where_clause {
            fn base(&self) -> &::hookshot_core::EventBase {
                &self.#base
            }

            fn base_mut(&mut self) -> &mut ::hookshot_core::EventBase {
                &mut self.#base
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            #declared_type
        }
    })
}
