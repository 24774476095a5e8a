//! Derive macro for `servicehandler::Params`.
//!
//! Generates the static field descriptors a struct needs to be used as an
//! operation parameter: field name (honouring `#[serde(rename)]`), query
//! key (`#[param(query = "..")]`), primitive kind and the ordered constraint
//! list declared with `#[validate(..)]`. Nested structures are marked
//! `#[param(json)]` and bind as whole JSON values.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Data, DeriveInput, Expr, Field, Fields, LitStr, Token};

#[proc_macro_derive(Params, attributes(param, validate))]
pub fn derive_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    check_container(input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Params can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Params can only be derived for structs with named fields",
            ))
        }
    };

    let mut descriptors = Vec::with_capacity(fields.len());
    for field in fields {
        if let Some(descriptor) = field_descriptor(field)? {
            descriptors.push(descriptor);
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::servicehandler::Params for #name #ty_generics #where_clause {
            fn shape() -> ::servicehandler::ParamShape {
                ::servicehandler::ParamShape::Struct(::std::vec![#(#descriptors),*])
            }
        }
    })
}

/// Container-level serde options that would change field names are rejected.
fn check_container(input: &DeriveInput) -> syn::Result<()> {
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                return Err(meta.error(
                    "Params does not support `rename_all`; rename fields individually",
                ));
            }
            skip_value(&meta)
        })?;
    }
    Ok(())
}

fn field_descriptor(field: &Field) -> syn::Result<Option<TokenStream2>> {
    let Some(ident) = &field.ident else {
        return Ok(None);
    };
    let mut field_name = ident.to_string().trim_start_matches("r#").to_string();
    let mut skipped = false;
    let mut wire_key: Option<LitStr> = None;
    let mut json = false;
    let mut constraints = Vec::new();

    for attr in &field.attrs {
        if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    field_name = lit.value();
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    skipped = true;
                    Ok(())
                } else if meta.path.is_ident("flatten") {
                    Err(meta.error("Params does not support flattened fields"))
                } else {
                    skip_value(&meta)
                }
            })?;
        } else if attr.path().is_ident("param") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("query") {
                    wire_key = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("json") {
                    json = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `query = \"key\"` or `json`"))
                }
            })?;
        } else if attr.path().is_ident("validate") {
            attr.parse_nested_meta(|meta| {
                constraints.push(constraint(&meta)?);
                Ok(())
            })?;
        }
    }

    if skipped {
        return Ok(None);
    }

    let ty = &field.ty;
    let base = if json {
        quote! { ::servicehandler::ParameterDescriptor::json(#field_name) }
    } else {
        quote! { ::servicehandler::ParameterDescriptor::of::<#ty>(#field_name) }
    };
    let wire_key = wire_key.map(|key| quote! { .wire_key(#key) });
    Ok(Some(quote! {
        #base
            #wire_key
            #(.constraint(#constraints))*
    }))
}

fn constraint(meta: &ParseNestedMeta) -> syn::Result<TokenStream2> {
    let path = &meta.path;
    if path.is_ident("required") {
        Ok(quote! { ::servicehandler::Constraint::Required })
    } else if path.is_ident("email") {
        Ok(quote! { ::servicehandler::Constraint::Email })
    } else if path.is_ident("alphanum") {
        Ok(quote! { ::servicehandler::Constraint::Alphanumeric })
    } else if path.is_ident("ascii") {
        Ok(quote! { ::servicehandler::Constraint::Ascii })
    } else if path.is_ident("length") {
        let (min, max) = bounds(meta)?;
        let min = min.unwrap_or_else(|| quote! { 0usize });
        let max = max.unwrap_or_else(|| quote! { usize::MAX });
        Ok(quote! {
            ::servicehandler::Constraint::Length { min: (#min) as usize, max: (#max) as usize }
        })
    } else if path.is_ident("range") {
        let (min, max) = bounds(meta)?;
        let min = min.unwrap_or_else(|| quote! { f64::MIN });
        let max = max.unwrap_or_else(|| quote! { f64::MAX });
        Ok(quote! {
            ::servicehandler::Constraint::Range { min: (#min) as f64, max: (#max) as f64 }
        })
    } else {
        Err(meta.error(
            "unknown constraint; expected one of required, email, alphanum, ascii, length, range",
        ))
    }
}

/// Parse `(min = .., max = ..)`; either bound may be omitted.
fn bounds(meta: &ParseNestedMeta) -> syn::Result<(Option<TokenStream2>, Option<TokenStream2>)> {
    let mut min = None;
    let mut max = None;
    meta.parse_nested_meta(|inner| {
        let expr: Expr = inner.value()?.parse()?;
        if inner.path.is_ident("min") {
            min = Some(quote! { #expr });
        } else if inner.path.is_ident("max") {
            max = Some(quote! { #expr });
        } else {
            return Err(inner.error("expected `min` or `max`"));
        }
        Ok(())
    })?;
    Ok((min, max))
}

/// Consume the value of a nested meta item this macro does not interpret.
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<TokenStream2>()?;
    }
    Ok(())
}
