use crate::{
    REQUIRED_VARIANTS,
    error::VerificationError
};
use proc_macro::TokenStream;
use quote::quote;
use syn::{
    spanned::Spanned,
    punctuated::Punctuated,
    token::Comma,
    Variant,
    Attribute,
    Error,
    Fields,
    Lit,
    Meta,
    NestedMeta,
    Result,
    Data::Enum,
    DeriveInput,
    Ident
};

fn is_dependent(variant: &syn::Variant) -> bool {
    variant.attrs
        .iter()
        .any(|a| a.path.is_ident("dependent"))
}

fn is_happy(variant: &syn::Variant) -> bool {
    REQUIRED_VARIANTS.contains(&variant.ident.to_string().as_str())
}

/// `PullSubscriptionReady` becomes `pull_subscription_ready`.
fn to_snake_case(ident: &Ident) -> Ident {
    let mut snake = String::new();
    for (i, ch) in ident.to_string().chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                snake.push('_');
            }
            snake.extend(ch.to_lowercase());
        } else {
            snake.push(ch);
        }
    }
    Ident::new(&snake, ident.span())
}

/// Nested metas of every `#[serde(...)]` attribute.
fn serde_metas(attrs: &[Attribute]) -> Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs.iter().filter(|a| a.path.is_ident("serde")) {
        if let Meta::List(list) = attr.parse_meta()? {
            metas.extend(list.nested.into_iter().filter_map(|nested| match nested {
                NestedMeta::Meta(meta) => Some(meta),
                NestedMeta::Lit(_) => None,
            }));
        }
    }
    Ok(metas)
}

/// The name serde uses for a variant, honoring `#[serde(rename = "...")]`.
fn wire_name(variant: &Variant) -> Result<String> {
    for meta in serde_metas(&variant.attrs)? {
        match meta {
            Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                return match nv.lit {
                    Lit::Str(name) => Ok(name.value()),
                    lit => Err(Error::new(lit.span(), "expected a string literal")),
                };
            }
            Meta::List(list) if list.path.is_ident("rename") => {
                return Err(VerificationError::SplitRename(variant.ident.to_string())
                    .spanned(list.span()));
            }
            _ => {}
        }
    }
    Ok(variant.ident.to_string())
}

/// Container level renames would change every name on the wire.
fn verify_container(attrs: &[Attribute]) -> Result<()> {
    for meta in serde_metas(attrs)? {
        if meta.path().is_ident("rename_all") {
            return Err(VerificationError::RenameAll.spanned(meta.span()));
        }
    }
    Ok(())
}

fn verify_variants(variants: &Punctuated<Variant, Comma>) -> Result<()> {
    let mut one_required = false;

    for v in variants {
        let name = v.ident.to_string();
        if !matches!(v.fields, Fields::Unit) {
            return Err(VerificationError::NotUnit(name).spanned(v.span()));
        }
        if is_happy(v) {
            // Ensure top level conditions are not dependents
            if is_dependent(v) {
                return Err(VerificationError::NotDependent(name).spanned(v.span()));
            }
            // Ensure only one top level condition exists
            if one_required {
                return Err(VerificationError::OneRequiredVariant.spanned(v.span()));
            }
            one_required = true;
        }
    }

    if !one_required {
        Err(VerificationError::OneRequiredVariant)?
    }

    Ok(())
}

pub fn inner_derive(ast: DeriveInput) -> Result<TokenStream> {
    let name = &ast.ident;

    let variants = match ast.data {
        Enum(syn::DataEnum { ref variants, .. }) => variants,
        _ => return Err(Error::new(
            ast.span(),
            "ConditionType may only be derived on enums"
        ))
    };

    verify_container(&ast.attrs)?;
    verify_variants(variants)?;

    let happy = match variants.iter().find(|v| is_happy(v)) {
        Some(v) => &v.ident,
        None => return Err(VerificationError::OneRequiredVariant.into()),
    };
    let dependents = variants.iter()
        .filter(|v| is_dependent(v))
        .map(|v| &v.ident);

    let all = variants.iter().map(|v| &v.ident).collect::<Vec<_>>();
    let all_names = variants.iter()
        .map(wire_name)
        .collect::<Result<Vec<_>>>()?;

    let capitalized = variants.iter()
        .filter(|v| !is_happy(v))
        .map(|v| v.ident.clone())
        .collect::<Vec<_>>();
    let snake = capitalized.iter()
        .map(to_snake_case)
        .collect::<Vec<_>>();
    let snake_doc = capitalized.iter()
        .map(|c| format!("Returns the `{c}` variant of the [`ConditionType`](::knative_gcp_conditions::ConditionType)."));

    let mark = snake.iter().map(|s| Ident::new(&format!("mark_{s}"), s.span()));
    let mark_doc = capitalized.iter().map(|c| format!("Set `{c}` to true."));
    let mark_with_reason = snake.iter().map(|s| Ident::new(&format!("mark_{s}_with_reason"), s.span()));
    let mark_not = snake.iter().map(|s| Ident::new(&format!("mark_not_{s}"), s.span()));
    let mark_not_doc = capitalized.iter().map(|c| format!("Set `{c}` to false."));
    let mark_unknown = snake.iter().map(|s| Ident::new(&format!("mark_{s}_unknown"), s.span()));

    let condition_type_name = Ident::new(&format!("{name}Type"), name.span());
    let condition_type_doc = format!("A [`ConditionType`](::knative_gcp_conditions::ConditionType) that implements this trait duck types to [`{name}`].");
    let manager_name = Ident::new(&format!("{name}Manager"), name.span());
    let manager_doc = format!("Allows a status to manage [`{name}`].");

    Ok(quote! {
        #[doc = #condition_type_doc]
        pub trait #condition_type_name: ::knative_gcp_conditions::ConditionType {
            #(
                #[doc = #snake_doc]
                fn #snake() -> Self;
            )*
        }

        #[automatically_derived]
        impl #condition_type_name for #name {
            #(
                #[inline]
                fn #snake() -> Self {
                    #name::#capitalized
                }
            )*
        }

        #[automatically_derived]
        impl ::knative_gcp_conditions::ConditionType for #name {
            #[inline]
            fn happy() -> Self {
                #name::#happy
            }

            #[inline]
            fn dependents() -> &'static [Self] {
                &[#(#name::#dependents),*]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    #(#name::#all => #all_names,)*
                }
            }

            fn condition_set() -> &'static ::knative_gcp_conditions::ConditionSet<Self> {
                static SET: ::std::sync::OnceLock<::knative_gcp_conditions::ConditionSet<#name>> =
                    ::std::sync::OnceLock::new();
                SET.get_or_init(::knative_gcp_conditions::ConditionSet::from_type)
            }
        }

        #[automatically_derived]
        impl ::std::default::Default for #name {
            fn default() -> Self {
                #name::#happy
            }
        }

        #[automatically_derived]
        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(<Self as ::knative_gcp_conditions::ConditionType>::as_str(self))
            }
        }

        #[doc = #manager_doc]
        pub trait #manager_name<S>: ::knative_gcp_conditions::ConditionAccessor<S>
        where S: #condition_type_name {
            #(
                #[doc = #mark_doc]
                fn #mark(&mut self) {
                    self.manager().mark_true(S::#snake());
                }

                fn #mark_with_reason(
                    &mut self,
                    reason: &str,
                    message: ::std::option::Option<::std::string::String>
                ) {
                    self.manager().mark_true_with_reason(S::#snake(), reason, message);
                }

                #[doc = #mark_not_doc]
                fn #mark_not(
                    &mut self,
                    reason: &str,
                    message: ::std::option::Option<::std::string::String>
                ) {
                    self.manager().mark_false(S::#snake(), reason, message);
                }

                fn #mark_unknown(
                    &mut self,
                    reason: &str,
                    message: ::std::option::Option<::std::string::String>
                ) {
                    self.manager().mark_unknown(S::#snake(), reason, message);
                }
            )*
        }

        impl<S: #condition_type_name, T: ::knative_gcp_conditions::ConditionAccessor<S> + ?Sized> #manager_name<S> for T {}
    }.into())
}
