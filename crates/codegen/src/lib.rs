//! Function-descriptor macros for ragllm.

use proc_macro::TokenStream;
use signature::FunctionsImpl;
use syn::parse_macro_input;

mod signature;

/// Describe every method of an `impl` block as a callable function.
///
/// Each method needs a doc comment. Its first paragraph becomes the
/// function description, and an `# Arguments` section supplies the
/// argument descriptions:
///
/// ```rust,ignore
/// struct Weather;
///
/// #[ragllm_codegen::functions]
/// impl Weather {
///     /// Get the current weather for a location.
///     ///
///     /// # Arguments
///     ///
///     /// * `location` - The city name
///     /// * `unit` - Temperature unit
///     fn get_weather(&self, location: String, unit: Option<String>) -> String {
///         // ...
///     }
/// }
/// ```
///
/// generates, next to the original block,
///
/// ```rust,ignore
/// impl Weather {
///     pub fn functions() -> Vec<rcore::Signature> {
///         vec![rcore::Signature::from_doc(
///             "get_weather",
///             "Get the current weather for a location.\n\n# Arguments\n...",
///             &[("location", "String"), ("unit", "Option<String>")],
///         )]
///     }
/// }
/// ```
///
/// The expansion refers to the core crate as `rcore`, so the calling
/// crate must depend on it under that name.
#[proc_macro_attribute]
pub fn functions(_: TokenStream, item: TokenStream) -> TokenStream {
    let functions = parse_macro_input!(item as FunctionsImpl);
    functions.into_token_stream().into()
}
