//! `#[derive(EnvOverlay)]` implementation.
//!
//! The derive emits one `FieldBinding` per field that is not skipped:
//!
//! | Field attribute | Binding |
//! |-----------------|---------|
//! | none | `FieldBinding::new("field", None, slot)` |
//! | `#[env("VAR")]` / `#[env(name = "VAR")]` | `FieldBinding::new("field", Some("VAR"), slot)` |
//! | `#[env(skip)]` | omitted |
//!
//! where `slot` is `EnvSlot::env_slot(&mut self.field)`. Dispatch on the field
//! type (scalar, record, optional record, unsupported) happens in the trait
//! impls, so the macro never inspects types.
//!
//! An untagged field goes through `env::__private::SlotSelect` instead, which
//! records types without an `EnvSlot` impl (`Option<String>`, `Duration`, ...)
//! as unsupported rather than failing to compile.

use proc_macro2::{TokenStream, TokenTree};
use quote::{ToTokens, quote};
use syn::{
    Attribute, Data, DeriveInput, Fields, Ident, Index, LitStr, Member, Path, Type,
    WherePredicate, parse_quote, spanned::Spanned,
};

// ============================================================================
// Attribute structures
// ============================================================================

/// Per-field `#[env(...)]` markers.
#[derive(Default)]
struct FieldAttrs {
    var: Option<LitStr>,
    skip: bool,
}

/// A field that ends up in the generated table.
struct BoundField {
    member: Member,
    name: String,
    var: Option<LitStr>,
    ty: Type,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_env_overlay(input: &DeriveInput) -> syn::Result<TokenStream> {
    let krate = parse_crate_path(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => collect_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "EnvOverlay can only be derived for structs",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "EnvOverlay cannot be derived for unions",
            ));
        }
    };

    Ok(generate_impl(input, &krate, &fields))
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_crate_path(attrs: &[Attribute]) -> syn::Result<Path> {
    let mut krate: Path = parse_quote!(::confkit);

    for attr in attrs {
        if !attr.path().is_ident("env_overlay") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                krate = meta.value()?.parse::<LitStr>()?.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported env_overlay attribute, expected `crate = \"...\"`"))
            }
        })?;
    }

    Ok(krate)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("env") {
            continue;
        }

        // #[env("VAR")]
        if let Ok(var) = attr.parse_args::<LitStr>() {
            set_var(&mut result, var)?;
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                set_var(&mut result, meta.value()?.parse::<LitStr>()?)
            } else if meta.path.is_ident("skip") {
                result.skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported env attribute, expected `\"VAR\"`, `name = \"VAR\"` or `skip`"))
            }
        })?;
    }

    if result.skip
        && let Some(var) = &result.var
    {
        return Err(syn::Error::new(
            var.span(),
            "a field marked #[env(skip)] cannot be bound to a variable",
        ));
    }

    Ok(result)
}

fn set_var(attrs: &mut FieldAttrs, var: LitStr) -> syn::Result<()> {
    if var.value().is_empty() {
        return Err(syn::Error::new(var.span(), "environment variable name cannot be empty"));
    }
    if attrs.var.is_some() {
        return Err(syn::Error::new(var.span(), "duplicate environment variable for field"));
    }
    attrs.var = Some(var);
    Ok(())
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<BoundField>> {
    let mut bound = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let (member, name) = match &field.ident {
            Some(ident) => {
                let name = ident.to_string();
                let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
                (Member::Named(ident.clone()), name)
            }
            None => (
                Member::Unnamed(Index {
                    index: index as u32,
                    span: field.span(),
                }),
                index.to_string(),
            ),
        };

        bound.push(BoundField {
            member,
            name,
            var: attrs.var,
            ty: field.ty.clone(),
        });
    }

    Ok(bound)
}

// ============================================================================
// Code generation
// ============================================================================

fn generate_impl(input: &DeriveInput, krate: &Path, fields: &[BoundField]) -> TokenStream {
    let name = &input.ident;

    let mut generics = input.generics.clone();
    let type_params: Vec<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    if !generics.params.is_empty() {
        let where_clause = generics.make_where_clause();
        for field in fields {
            // Untagged fields of concrete types fall back to unsupported.
            if field.var.is_none() && !mentions_any(field.ty.to_token_stream(), &type_params) {
                continue;
            }
            let ty = &field.ty;
            let predicate: WherePredicate = parse_quote!(#ty: #krate::env::EnvSlot);
            where_clause.predicates.push(predicate);
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let bindings = fields.iter().map(|field| {
        let member = &field.member;
        let field_name = &field.name;
        let env = match &field.var {
            Some(var) => quote! { ::core::option::Option::Some(#var) },
            None => quote! { ::core::option::Option::None },
        };
        let slot = match &field.var {
            Some(_) => quote! { #krate::env::EnvSlot::env_slot(&mut self.#member) },
            None => {
                let ty = &field.ty;
                quote! {{
                    #[allow(unused_imports)]
                    use #krate::env::__private::{SlotFallback as _, SlotViaTrait as _};
                    (&#krate::env::__private::SlotSelect::<#ty>::new()).slot_fn()(&mut self.#member)
                }}
            }
        };
        quote! {
            #krate::env::FieldBinding::new(#field_name, #env, #slot)
        }
    });

    quote! {
        #[automatically_derived]
        impl #impl_generics #krate::env::EnvOverlay for #name #ty_generics #where_clause {
            fn env_fields(&mut self) -> ::std::vec::Vec<#krate::env::FieldBinding<'_>> {
                ::std::vec![#(#bindings),*]
            }
        }
    }
}

fn mentions_any(tokens: TokenStream, idents: &[Ident]) -> bool {
    tokens.into_iter().any(|token| match token {
        TokenTree::Ident(ident) => idents.contains(&ident),
        TokenTree::Group(group) => mentions_any(group.stream(), idents),
        _ => false,
    })
}
