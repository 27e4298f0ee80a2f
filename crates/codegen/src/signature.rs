//! Signature extraction for `#[functions]`.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{
    Attribute, Expr, FnArg, GenericArgument, ImplItem, ItemImpl, Lit, Meta, Pat, PathArguments,
    Result, Type,
    parse::{Parse, ParseStream},
};

/// A parsed `impl` block and the signatures of its methods.
pub struct FunctionsImpl {
    impl_block: ItemImpl,
    signatures: Vec<TokenStream>,
}

impl Parse for FunctionsImpl {
    fn parse(input: ParseStream) -> Result<Self> {
        let impl_block: ItemImpl = input.parse()?;
        let mut signatures = Vec::new();

        for item in &impl_block.items {
            let ImplItem::Fn(method) = item else {
                continue;
            };

            let name = method.sig.ident.to_string();
            let Some(doc) = doc_string(&method.attrs) else {
                return Err(syn::Error::new_spanned(
                    &method.sig.ident,
                    format!("method `{name}` needs a doc comment to be described as a function"),
                ));
            };

            let mut args = Vec::new();
            for input in &method.sig.inputs {
                let FnArg::Typed(pat_type) = input else {
                    continue;
                };
                let Pat::Ident(pat_ident) = &*pat_type.pat else {
                    return Err(syn::Error::new_spanned(
                        &pat_type.pat,
                        "arguments must be plain identifiers",
                    ));
                };
                let arg = pat_ident.ident.to_string();
                let ty = type_name(&pat_type.ty)?;
                args.push(quote! { (#arg, #ty) });
            }

            signatures.push(quote! {
                rcore::Signature::from_doc(#name, #doc, &[#(#args),*])
            });
        }

        Ok(Self {
            impl_block,
            signatures,
        })
    }
}

impl FunctionsImpl {
    pub fn into_token_stream(self) -> TokenStream {
        let impl_block = &self.impl_block;
        let ty = &impl_block.self_ty;
        let (impl_generics, _, where_clause) = impl_block.generics.split_for_impl();
        let signatures = &self.signatures;

        quote! {
            #impl_block

            impl #impl_generics #ty #where_clause {
                /// The documented methods of this block as function descriptors.
                pub fn functions() -> Vec<rcore::Signature> {
                    vec![#(#signatures),*]
                }
            }
        }
    }
}

/// Join `#[doc = "..."]` attributes into the doc comment text.
fn doc_string(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(s) => Some(s.value()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

// Supported argument types:
// 1. scalars: strings, chars, bools, integers and floats
// 2. `Option<T>` of a supported type, marking the argument optional
// 3. `Vec<T>` and slices `&[T]`, normalized to `Vec<T>`
// 4. `&str`, normalized to `String`
fn type_name(ty: &Type) -> Result<String> {
    match ty {
        Type::Path(type_path) => {
            let segment = type_path
                .path
                .segments
                .last()
                .ok_or_else(|| syn::Error::new_spanned(type_path, "empty type path"))?;

            let ident = segment.ident.to_string();
            if ident == "Option" || ident == "Vec" {
                let PathArguments::AngleBracketed(args) = &segment.arguments else {
                    return Err(syn::Error::new_spanned(segment, format!("invalid {ident} type")));
                };
                let Some(GenericArgument::Type(inner)) = args.args.first() else {
                    return Err(syn::Error::new_spanned(segment, format!("invalid {ident} type")));
                };
                return Ok(format!("{ident}<{}>", type_name(inner)?));
            }

            match ident.as_str() {
                "String" | "str" => Ok("String".to_owned()),
                "char" | "bool" | "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8"
                | "u16" | "u32" | "u64" | "u128" | "usize" | "f32" | "f64" => Ok(ident),
                _ => Err(syn::Error::new_spanned(
                    segment,
                    format!("unsupported argument type `{}`", type_path.to_token_stream()),
                )),
            }
        }
        Type::Reference(reference) => type_name(&reference.elem),
        Type::Slice(slice) => Ok(format!("Vec<{}>", type_name(&slice.elem)?)),
        Type::Tuple(_) => Err(syn::Error::new_spanned(ty, "tuple arguments are not supported")),
        _ => Err(syn::Error::new_spanned(ty, "unsupported argument type")),
    }
}
