use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{FnArg, Ident, ItemFn, parse_macro_input};

/// Implementation of the `#[listen]` attribute macro.
///
/// Leaves the decorated function unchanged and appends a
/// `#[::hookshot_core::linkme::distributed_slice]` static that adds the
/// function to `hookshot_framework::LISTENERS` under `class::fn_name`, where
/// `class` defaults to the module path.
pub fn listen(attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = parse_macro_input!(item as ItemFn);

    let mut class: Option<syn::LitStr> = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("class") {
            class = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unknown listen attribute, expected `class`"))
        }
    });
    parse_macro_input!(attr with parser);

    if let Some(FnArg::Receiver(receiver)) = func.sig.inputs.first() {
        return syn::Error::new_spanned(
            receiver,
            "#[listen] only supports free functions; bind methods with `HookRef::method`",
        )
        .into_compile_error()
        .into();
    }
    if func.sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            func.sig.asyncness,
            "#[listen] functions are called synchronously and cannot be async",
        )
        .into_compile_error()
        .into();
    }

    let fn_name = &func.sig.ident;
    let fn_name_str = fn_name.to_string();
    let static_name = Ident::new(
        &format!("_HOOKSHOT_LISTENER_{}", fn_name_str.to_uppercase()),
        Span::call_site(),
    );
    let class = match class {
        Some(lit) => quote!(#lit),
        None => quote!(::std::module_path!()),
    };

    quote! {
        #func

        #[::hookshot_core::linkme::distributed_slice(::hookshot_framework::LISTENERS)]
        #[linkme(crate = ::hookshot_core::linkme)]
        static #static_name: ::hookshot_framework::ListenerEntry =
            ::hookshot_framework::ListenerEntry {
                class: #class,
                method: #fn_name_str,
                make: || ::hookshot_core::Listener::into_hook_ref(#fn_name),
            };
    }
    .into()
}
