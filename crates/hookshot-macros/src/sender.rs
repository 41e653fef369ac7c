//! `#[derive(Sender)]` implementation: **parent-in-child** classes.
//!
//! `#[derive(Sender)]` generates:
//!
//! 1. `impl SenderType` with the static class descriptor
//! 2. `impl Sender` with `upcast_ref` walking into the parent field
//! 3. `impl Deref[Mut]` to the parent, when a parent field exists
//! 4. a `SENDER_CLASSES` entry so the class is known before it is first used
//!    (non-generic types only)
//!
//! # Struct attribute `#[sender(...)]`
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `name` | `"Processor"` | No | Class name (default: the struct path, e.g. `app::Processor`) |
//!
//! # Field attribute `#[sender(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `parent` | Marks the embedded parent sender |

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, Member, Type, spanned::Spanned};

fn parse_struct_attrs(attrs: &[Attribute]) -> syn::Result<Option<syn::LitStr>> {
    let mut name = None;

    for attr in attrs {
        if !attr.path().is_ident("sender") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<syn::LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unknown sender attribute, expected `name`"))
            }
        })?;
    }

    Ok(name)
}

fn is_parent(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut parent = false;
    for attr in attrs {
        if !attr.path().is_ident("sender") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("parent") {
                parent = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute, expected `parent`"))
            }
        })?;
    }
    Ok(parent)
}

/// Finds the field marked `#[sender(parent)]`, for named and tuple structs.
fn parent_field(fields: &Fields) -> syn::Result<Option<(Member, Type)>> {
    let mut parent = None;
    for (index, field) in fields.iter().enumerate() {
        if !is_parent(&field.attrs)? {
            continue;
        }
        if parent.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "only one field can be marked with #[sender(parent)]",
            ));
        }
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };
        parent = Some((member, field.ty.clone()));
    }
    Ok(parent)
}

pub fn derive_sender(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "Sender can only be derived for structs",
        ));
    };

    let name = &input.ident;
    let class_name = match parse_struct_attrs(&input.attrs)? {
        Some(explicit) => quote! { #explicit },
        None => quote! { ::std::concat!(::std::module_path!(), "::", ::std::stringify!(#name)) },
    };
    let parent = parent_field(&data.fields)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let class = match &parent {
        Some((_, parent_ty)) => quote! {
            ::hookshot_core::SenderClass::with_parent(
                #class_name,
                <#parent_ty as ::hookshot_core::SenderType>::CLASS,
            )
        },
        None => quote! { ::hookshot_core::SenderClass::new(#class_name) },
    };

    let upcast = parent.as_ref().map(|(member, _)| {
        quote! {
            fn upcast_ref(
                &self,
                type_id: ::std::any::TypeId,
            ) -> ::std::option::Option<&dyn ::std::any::Any> {
                if type_id == ::std::any::TypeId::of::<Self>() {
                    ::std::option::Option::Some(self)
                } else {
                    ::hookshot_core::Sender::upcast_ref(&self.#member, type_id)
                }
            }
        }
    });

    let deref_impls = parent.as_ref().map(|(member, parent_ty)| {
        quote! {
            impl #impl_generics ::std::ops::Deref for #name #ty_generics #where_clause {
                type Target = #parent_ty;
                #[inline]
                fn deref(&self) -> &Self::Target {
                    &self.#member
                }
            }

            impl #impl_generics ::std::ops::DerefMut for #name #ty_generics #where_clause {
                #[inline]
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut self.#member
                }
            }
        }
    });

    let registration = input.generics.params.is_empty().then(|| {
        let static_name = Ident::new(
            &format!("_HOOKSHOT_SENDER_CLASS_{}", name.to_string().to_uppercase()),
            Span::call_site(),
        );
        quote! {
            #[::hookshot_core::linkme::distributed_slice(::hookshot_core::SENDER_CLASSES)]
            #[linkme(crate = ::hookshot_core::linkme)]
            static #static_name: &'static ::hookshot_core::SenderClass =
                <#name as ::hookshot_core::SenderType>::CLASS;
        }
    });

    Ok(quote! {
        impl #impl_generics ::hookshot_core::SenderType for #name #ty_generics #where_clause {
            const CLASS: &'static ::hookshot_core::SenderClass = &#class;
        }

        impl #impl_generics ::hookshot_core::Sender for #name #ty_generics #where_clause {
            fn class(&self) -> &'static ::hookshot_core::SenderClass {
                <Self as ::hookshot_core::SenderType>::CLASS
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            #upcast
        }

        #deref_impls

        #registration
    })
}
