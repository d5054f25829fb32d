#![forbid(unsafe_code)]

extern crate proc_macro;

mod attr_util;
mod field;
mod model;

use proc_macro::TokenStream;

/// Declares a model from an `impl` block of field functions.
///
/// ```ignore
/// #[nodeedge::model("default::User")]
/// impl User {
///     fn name() -> Str;
///     fn nick() -> Option<Str>;
///     fn friend() -> Option<Link<Self>>;
/// }
/// ```
///
/// The argument is the node name, or `link_property` for link-property
/// models.
#[proc_macro_attribute]
pub fn model(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(args as model::ModelArgs);
    let impl_model = syn::parse_macro_input!(input as model::ImplModel);

    let tokens = model::gen_model(args, impl_model);

    TokenStream::from(tokens)
}
