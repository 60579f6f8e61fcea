//! Pagehand Derive Macros: Capability Tables
//!
//! A page object answers `supports(name)` and `perform(name, args)` for the
//! dispatcher. Writing that table by hand means repeating every method name
//! as a string and keeping both lists in sync. `#[capabilities]` generates it
//! from an inherent `impl` block instead.
//!
//! # Example
//!
//! ```ignore
//! use pagehand::{capabilities, DispatchProxy, ElementHandle, HarnessResult, Value};
//!
//! #[derive(Debug)]
//! struct ApplicantHomepage {
//!     proxy: DispatchProxy,
//! }
//!
//! #[capabilities]
//! impl ApplicantHomepage {
//!     // operation "getting_started_button"
//!     fn getting_started_button(&mut self) -> HarnessResult<ElementHandle> {
//!         self.proxy.seek("getStarted")
//!     }
//!
//!     // operation "select_state", called with the dispatch arguments
//!     #[capability(name = "select_state")]
//!     fn choose_state(&mut self, args: &[Value]) -> HarnessResult<()> {
//!         // ...
//!         Ok(())
//!     }
//!
//!     #[capability(skip)]
//!     fn helper(&self) -> usize {
//!         0
//!     }
//! }
//! ```
//!
//! # Rules
//!
//! - Every method with a `&self` or `&mut self` receiver is an operation,
//!   whatever its visibility.
//! - A method takes either no further arguments or one `&[Value]`.
//! - It returns `Result<T, HarnessError>` with `T: Into<Value>`.
//! - Associated functions without a receiver are left alone.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Error, GenericParam, Ident, ImplItem, ItemImpl, LitStr, Type,
};

/// Generate `pagehand::Capable` for the annotated inherent `impl` block.
///
/// # Attributes
///
/// - `#[capability(name = "custom_name")]` - Override the operation name
/// - `#[capability(skip)]` - Exclude a method
#[proc_macro_attribute]
pub fn capabilities(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return Error::new(Span::call_site(), "#[capabilities] takes no arguments")
            .to_compile_error()
            .into();
    }

    let mut input = parse_macro_input!(item as ItemImpl);
    match expand(&mut input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

// ============================================================================
// Expansion
// ============================================================================

/// One generated dispatch arm
#[derive(Debug)]
struct Operation {
    name: String,
    method: Ident,
    takes_args: bool,
}

#[derive(Debug, Default)]
struct CapabilityOptions {
    present: bool,
    name: Option<String>,
    skip: bool,
}

fn expand(input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[capabilities] must be applied to an inherent impl block",
        ));
    }

    let operations = collect_operations(input)?;
    let names: Vec<&str> = operations.iter().map(|op| op.name.as_str()).collect();
    let arms = operations.iter().map(|op| {
        let name = &op.name;
        let method = &op.method;
        let call = if op.takes_args {
            quote!(self.#method(args))
        } else {
            quote!(self.#method())
        };
        quote! {
            #name => #call.map(::core::convert::Into::into),
        }
    });

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        #[automatically_derived]
        impl #impl_generics ::pagehand::Capable for #self_ty #where_clause {
            fn supports(&self, operation: &str) -> bool {
                const OPERATIONS: &[&str] = &[#(#names),*];
                OPERATIONS.contains(&operation)
            }

            #[allow(unused_variables)]
            fn perform(
                &mut self,
                operation: &str,
                args: &[::pagehand::Value],
            ) -> ::pagehand::HarnessResult<::pagehand::Value> {
                match operation {
                    #(#arms)*
                    other => ::core::result::Result::Err(
                        ::pagehand::HarnessError::not_found(other),
                    ),
                }
            }
        }
    })
}

/// Walk the impl block, strip `#[capability]` attributes and record the
/// operations in declaration order.
fn collect_operations(input: &mut ItemImpl) -> syn::Result<Vec<Operation>> {
    let mut operations: Vec<Operation> = Vec::new();

    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let options = take_capability_options(&mut method.attrs)?;
        if options.skip {
            continue;
        }

        let sig = &method.sig;
        let Some(receiver) = sig.receiver() else {
            if options.present {
                return Err(Error::new_spanned(
                    &sig.ident,
                    "#[capability] requires a `&self` or `&mut self` method",
                ));
            }
            continue;
        };
        if !matches!(&*receiver.ty, Type::Reference(_)) {
            return Err(Error::new_spanned(
                receiver,
                "capability methods must take `&self` or `&mut self`",
            ));
        }
        if sig.asyncness.is_some() {
            return Err(Error::new_spanned(
                sig.asyncness,
                "capability methods cannot be async",
            ));
        }
        if sig
            .generics
            .params
            .iter()
            .any(|p| !matches!(p, GenericParam::Lifetime(_)))
        {
            return Err(Error::new_spanned(
                &sig.generics,
                "capability methods cannot be generic",
            ));
        }

        let takes_args = match sig.inputs.len() {
            1 => false,
            2 => true,
            _ => {
                return Err(Error::new_spanned(
                    &sig.inputs,
                    "capability methods take no arguments or a single `&[Value]`",
                ))
            }
        };

        let name = options.name.unwrap_or_else(|| sig.ident.to_string());
        if operations.iter().any(|op| op.name == name) {
            return Err(Error::new_spanned(
                &sig.ident,
                format!("duplicate capability `{name}`"),
            ));
        }

        operations.push(Operation {
            name,
            method: sig.ident.clone(),
            takes_args,
        });
    }

    Ok(operations)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Remove every `#[capability(...)]` attribute, merging their options
fn take_capability_options(attrs: &mut Vec<Attribute>) -> syn::Result<CapabilityOptions> {
    let mut options = CapabilityOptions::default();
    let mut error: Option<Error> = None;

    attrs.retain(|attr| {
        if !attr.path().is_ident("capability") {
            return true;
        }
        options.present = true;
        if let Err(err) = parse_capability_attr(attr, &mut options) {
            match error.as_mut() {
                Some(first) => first.combine(err),
                None => error = Some(err),
            }
        }
        false
    });

    error.map_or(Ok(options), Err)
}

/// Parse `#[capability(name = "...")]` or `#[capability(skip)]`
fn parse_capability_attr(attr: &Attribute, options: &mut CapabilityOptions) -> syn::Result<()> {
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("skip") {
            options.skip = true;
            return Ok(());
        }
        if meta.path.is_ident("name") {
            let lit: LitStr = meta.value()?.parse()?;
            let value = lit.value();
            if value.is_empty() {
                return Err(meta.error("capability name must not be empty"));
            }
            options.name = Some(value);
            return Ok(());
        }
        Err(meta.error("expected `name = \"...\"` or `skip`"))
    })
}
