use quote::quote;
use syn::parse::ParseStream;

use crate::field;

pub enum ModelArgs {
    Node(Option<syn::LitStr>),
    LinkProperty,
}

impl syn::parse::Parse for ModelArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(ModelArgs::Node(None));
        }
        if input.peek(syn::LitStr) {
            return Ok(ModelArgs::Node(Some(input.parse()?)));
        }

        let ident: syn::Ident = input.parse()?;
        if ident == "node" {
            Ok(ModelArgs::Node(None))
        } else if ident == "link_property" {
            Ok(ModelArgs::LinkProperty)
        } else {
            Err(syn::Error::new(
                ident.span(),
                "Expected a node name, `node` or `link_property`",
            ))
        }
    }
}

pub struct ImplModel {
    pub path: syn::Path,
    pub ident: syn::Ident,
    pub mod_ident: syn::Ident,
    pub field_results: Vec<syn::Result<field::FieldMethod>>,
}

impl syn::parse::Parse for ImplModel {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let _: syn::token::Impl = input.parse()?;
        let path: syn::Path = input.parse()?;

        let content;
        let _brace_token = syn::braced!(content in input);

        let mut field_results = Vec::new();
        while !content.is_empty() {
            field_results.push(
                content
                    .parse::<syn::TraitItemMethod>()
                    .and_then(field::FieldMethod::try_from),
            );
        }

        let ident = match path.segments.last() {
            Some(segment) => segment.ident.clone(),
            None => return Err(input.error("Expected a model type")),
        };
        let ident_lower = ident.to_string().to_lowercase();
        let mod_ident = quote::format_ident!("__{}", ident_lower);

        Ok(ImplModel {
            path,
            ident,
            mod_ident,
            field_results,
        })
    }
}

pub fn gen_model(args: ModelArgs, impl_model: ImplModel) -> proc_macro2::TokenStream {
    let path = &impl_model.path;
    let mod_ident = &impl_model.mod_ident;
    let model_name = syn::LitStr::new(&impl_model.ident.to_string(), impl_model.ident.span());

    let schema = match &args {
        ModelArgs::Node(Some(node_name)) => quote! {
            ::nodeedge::model::ModelSchema::node(#model_name).node_name(#node_name)
        },
        ModelArgs::Node(None) => quote! {
            ::nodeedge::model::ModelSchema::node(#model_name)
        },
        ModelArgs::LinkProperty => quote! {
            ::nodeedge::model::ModelSchema::link_property(#model_name)
        },
    };

    let field_decls = impl_model.field_results.iter().map(|result| match result {
        Ok(field) => {
            let decl = field::gen_decl(field, &impl_model.ident);
            quote! { .field(#decl) }
        }
        Err(err) => err.to_compile_error(),
    });

    let field_handles = impl_model.field_results.iter().map(|result| {
        result
            .as_ref()
            .map(field::gen_handle)
            .unwrap_or_else(|err| err.to_compile_error())
    });

    quote! {
        impl ::nodeedge::Model for #path {
            fn schema() -> ::nodeedge::model::ModelSchema {
                #schema
                    #(#field_decls)*
            }

            fn class() -> ::nodeedge::NodeEdgeResult<::std::sync::Arc<::nodeedge::model::ModelClass>> {
                #mod_ident::CLASS.get_or_bind(<Self as ::nodeedge::Model>::schema)
            }
        }

        impl #path {
            #(#field_handles)*
        }

        #[doc(hidden)]
        mod #mod_ident {
            pub(super) static CLASS: ::nodeedge::model::ClassCell = ::nodeedge::model::ClassCell::new();
        }
    }
}
