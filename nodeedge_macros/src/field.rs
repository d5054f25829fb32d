use quote::*;
use syn::spanned::Spanned;

use crate::attr_util;

/// One `fn name() -> Type;` declaration of a model.
pub struct FieldMethod {
    pub ident: syn::Ident,
    pub field_name: syn::LitStr,
    pub optional: bool,
    pub ty: FieldTy,
    pub meta: Meta,
}

pub enum FieldTy {
    Plain(syn::Type),
    Link {
        multi: bool,
        target: syn::Path,
        property: Option<syn::Path>,
    },
}

pub struct Meta {
    pub default: Option<syn::Expr>,
}

impl FieldMethod {
    pub fn try_from(method: syn::TraitItemMethod) -> syn::Result<Self> {
        let span = method.span();
        let meta = meta_from_attrs(method.attrs)?;

        if !method.sig.inputs.is_empty() {
            return Err(syn::Error::new(
                method.sig.inputs.span(),
                "Model field functions take no arguments",
            ));
        }
        if let Some(block) = &method.default {
            return Err(syn::Error::new(block.span(), "Expected `;`, not a body"));
        }

        let user_ty = match method.sig.output {
            syn::ReturnType::Default => return Err(syn::Error::new(span, "Expected return type")),
            syn::ReturnType::Type(_, ty) => *ty,
        };

        let inner = single_generic(&user_ty, "Option").cloned();
        let (optional, ty) = match inner {
            Some(inner) => (true, inner),
            None => (false, user_ty),
        };

        let field_name = syn::LitStr::new(&method.sig.ident.to_string(), method.sig.ident.span());

        Ok(FieldMethod {
            ident: method.sig.ident,
            field_name,
            optional,
            ty: extract_field_ty(ty)?,
            meta,
        })
    }
}

fn last_segment(ty: &syn::Type) -> Option<&syn::PathSegment> {
    match ty {
        syn::Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn generic_types(segment: &syn::PathSegment) -> Vec<&syn::Type> {
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}

fn single_generic<'t>(ty: &'t syn::Type, name: &str) -> Option<&'t syn::Type> {
    let segment = last_segment(ty)?;
    if segment.ident != name {
        return None;
    }
    match generic_types(segment).as_slice() {
        [inner] => Some(*inner),
        _ => None,
    }
}

fn model_path(ty: &syn::Type) -> syn::Result<syn::Path> {
    match ty {
        syn::Type::Path(path) if path.qself.is_none() => Ok(path.path.clone()),
        _ => Err(syn::Error::new(ty.span(), "Expected a model type")),
    }
}

fn extract_field_ty(ty: syn::Type) -> syn::Result<FieldTy> {
    let segment = match last_segment(&ty) {
        Some(segment) => segment,
        None => return Err(syn::Error::new(ty.span(), "Expected simple Path-like type")),
    };

    let multi = if segment.ident == "Link" {
        false
    } else if segment.ident == "MultiLink" {
        true
    } else {
        return Ok(FieldTy::Plain(ty));
    };

    match generic_types(segment).as_slice() {
        [target] => Ok(FieldTy::Link {
            multi,
            target: model_path(target)?,
            property: None,
        }),
        [target, property] => Ok(FieldTy::Link {
            multi,
            target: model_path(target)?,
            property: Some(model_path(property)?),
        }),
        _ => Err(syn::Error::new(
            segment.span(),
            "Expected a target model: Link<Target> or Link<Target, LinkProperty>",
        )),
    }
}

fn meta_from_attrs(attrs: Vec<syn::Attribute>) -> syn::Result<Meta> {
    let mut meta = Meta { default: None };

    for attr in attrs {
        if attr_util::attr_has_simple_ident(&attr, "default") {
            meta.default = Some(attr.parse_args()?);
        } else {
            return Err(syn::Error::new(
                attr.path.span(),
                "Unrecognized attribute",
            ));
        }
    }

    Ok(meta)
}

/// Name of the model a link points at; `Self` is the model being declared.
fn model_name(path: &syn::Path, model_ident: &syn::Ident) -> syn::LitStr {
    match path.segments.last() {
        Some(segment) if segment.ident == "Self" => {
            syn::LitStr::new(&model_ident.to_string(), segment.ident.span())
        }
        Some(segment) => syn::LitStr::new(&segment.ident.to_string(), segment.ident.span()),
        None => syn::LitStr::new(&model_ident.to_string(), path.span()),
    }
}

pub fn gen_decl(field: &FieldMethod, model_ident: &syn::Ident) -> proc_macro2::TokenStream {
    let field_name = &field.field_name;

    let mut decl = match &field.ty {
        FieldTy::Plain(ty) => {
            let span = ty.span();
            quote_spanned! {span=>
                ::nodeedge::model::FieldDecl::new(
                    #field_name,
                    <#ty as ::nodeedge::field::FieldType>::KIND,
                )
            }
        }
        FieldTy::Link {
            multi,
            target,
            property,
        } => {
            let kind = if *multi {
                quote! { MultiLink }
            } else {
                quote! { Link }
            };
            let target = model_name(target, model_ident);
            let property = match property {
                Some(property) => {
                    let property = model_name(property, model_ident);
                    quote! { ::std::option::Option::Some(#property) }
                }
                None => quote! { ::std::option::Option::None },
            };
            quote! {
                ::nodeedge::model::FieldDecl::new(#field_name, ::nodeedge::ty::FieldKind::#kind)
                    .link_to(#target, #property)
            }
        }
    };

    if field.optional {
        decl = quote! { #decl.optional() };
    }
    if let Some(default) = &field.meta.default {
        decl = quote! { #decl.default_value(#default) };
    }

    decl
}

pub fn gen_handle(field: &FieldMethod) -> proc_macro2::TokenStream {
    let ident = &field.ident;
    let field_name = &field.field_name;

    quote! {
        pub fn #ident() -> ::nodeedge::NodeEdgeResult<::nodeedge::model::ModelField> {
            <Self as ::nodeedge::Model>::field(#field_name)
        }
    }
}
