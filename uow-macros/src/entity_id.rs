use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    Generics, Item, Result, Token, WherePredicate, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[entity_id] 宏实现
/// 仅支持单字段 tuple struct，并为包装类型：
/// - 合并/追加派生：Default, Clone, Debug(可关闭), Serialize, Deserialize, PartialEq, Eq, Hash
/// - 提供 new(value)、Display、FromStr、AsRef/AsMut、From 等便捷实现
/// - 实现 `::uow_core::entity::IdentityKey`，序列值委托给内部类型
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityIdAttrConfig);
    let input = parse_macro_input!(item as Item);

    let st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity_id] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let inner_ty = match &st.fields {
        syn::Fields::Unnamed(f) if f.unnamed.len() == 1 => match f.unnamed.first() {
            Some(field) => field.ty.clone(),
            None => return single_field_error(f.span()),
        },
        syn::Fields::Unnamed(f) => return single_field_error(f.span()),
        _ => {
            return syn::Error::new(
                st.span(),
                "#[entity_id] supports only tuple struct, e.g., struct X(i64);",
            )
            .to_compile_error()
            .into();
        }
    };

    let mut st_out = st.clone();
    let mut required: Vec<syn::Path> = vec![
        syn::parse_quote!(Default),
        syn::parse_quote!(Clone),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(Eq),
        syn::parse_quote!(Hash),
    ];
    if cfg.derive_debug {
        required.insert(2, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st_out.attrs, required);

    let ident = &st_out.ident;
    let generics = st_out.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let from_str_generics = bounded(&generics, syn::parse_quote!(#inner_ty: ::std::str::FromStr));
    let from_str_where = &from_str_generics.where_clause;
    let display_generics = bounded(&generics, syn::parse_quote!(#inner_ty: ::std::fmt::Display));
    let display_where = &display_generics.where_clause;
    let clone_generics = bounded(&generics, syn::parse_quote!(#inner_ty: ::core::clone::Clone));
    let clone_where = &clone_generics.where_clause;
    let key_generics = bounded(
        &generics,
        syn::parse_quote!(#inner_ty: ::uow_core::entity::IdentityKey),
    );
    let key_where = &key_generics.where_clause;

    let out = quote! {
        #st_out

        impl #impl_generics #ident #ty_generics #where_clause {
            pub fn new(value: #inner_ty) -> Self { Self(value) }
        }

        impl #impl_generics ::std::str::FromStr for #ident #ty_generics #from_str_where {
            type Err = <#inner_ty as ::std::str::FromStr>::Err;
            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let inner: #inner_ty = s.parse()?;
                ::std::result::Result::Ok(Self(inner))
            }
        }

        impl #impl_generics ::std::fmt::Display for #ident #ty_generics #display_where {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl #impl_generics ::uow_core::entity::IdentityKey for #ident #ty_generics #key_where {
            fn from_sequence(seq: u64) -> ::core::option::Option<Self> {
                <#inner_ty as ::uow_core::entity::IdentityKey>::from_sequence(seq).map(Self)
            }
        }

        impl #impl_generics ::core::convert::AsRef<#inner_ty> for #ident #ty_generics #where_clause {
            fn as_ref(&self) -> &#inner_ty { &self.0 }
        }

        impl #impl_generics ::core::convert::AsMut<#inner_ty> for #ident #ty_generics #where_clause {
            fn as_mut(&mut self) -> &mut #inner_ty { &mut self.0 }
        }

        impl #impl_generics ::core::convert::From<#ident #ty_generics> for #inner_ty #where_clause {
            fn from(value: #ident #ty_generics) -> Self { value.0 }
        }

        impl #impl_generics ::core::convert::From<&#ident #ty_generics> for #inner_ty #clone_where {
            fn from(value: &#ident #ty_generics) -> Self { value.0.clone() }
        }

        impl #impl_generics ::core::convert::From<#inner_ty> for #ident #ty_generics #where_clause {
            fn from(value: #inner_ty) -> Self { Self(value) }
        }

        impl #impl_generics ::core::convert::From<&#inner_ty> for #ident #ty_generics #clone_where {
            fn from(value: &#inner_ty) -> Self { Self(value.clone()) }
        }
    };

    TokenStream::from(out)
}

fn single_field_error(span: proc_macro2::Span) -> TokenStream {
    syn::Error::new(
        span,
        "#[entity_id] requires a tuple struct with exactly one field",
    )
    .to_compile_error()
    .into()
}

// 在已有 where 子句上追加一条约束
fn bounded(generics: &Generics, predicate: WherePredicate) -> Generics {
    let mut generics = generics.clone();
    generics.make_where_clause().predicates.push(predicate);
    generics
}

// -------- parsing --------

struct EntityIdAttrConfig {
    derive_debug: bool,
}

impl Parse for EntityIdAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut derive_debug: Option<bool> = None;

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            if key != "debug" {
                return Err(syn::Error::new(
                    key.span(),
                    "unknown key in attribute; expected 'debug'",
                ));
            }
            let _eq: Token![=] = input.parse()?;
            let value: syn::LitBool = input.parse()?;
            if derive_debug.replace(value.value()).is_some() {
                return Err(syn::Error::new(
                    value.span(),
                    "duplicate key 'debug' in attribute",
                ));
            }
            if !input.is_empty() {
                let _comma: Token![,] = input.parse()?;
            }
        }

        Ok(Self {
            derive_debug: derive_debug.unwrap_or(true),
        })
    }
}
