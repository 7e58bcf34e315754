use crate::derive_utils::apply_derives;
use crate::field_utils::ensure_leading_field;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, Item, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[model] 宏实现
/// - 若缺失则追加字段 `#[serde(default)] id: Option<KeyType>` 并置于字段最前
/// - 合并派生：Debug, Clone, PartialEq, Serialize, Deserialize
/// - 自动实现 `::uow_core::model::Model`（TABLE/Key/key/set_key）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as ModelAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[model] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let Some(table) = cfg.table else {
        return syn::Error::new(st.ident.span(), "#[model] requires table = \"...\"")
            .to_compile_error()
            .into();
    };
    if table.value().trim().is_empty() {
        return syn::Error::new(table.span(), "table name must not be empty")
            .to_compile_error()
            .into();
    }

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let key_type = cfg.key_ty.unwrap_or_else(|| syn::parse_quote! { i64 });
    let field_ty: Type = syn::parse_quote! { ::core::option::Option<#key_type> };
    // 新建记录在插入前没有主键，反序列化时允许缺省
    let serde_default: Attribute = syn::parse_quote! { #[serde(default)] };
    ensure_leading_field(fields_named, "id", &field_ty, &[serde_default]);

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut st.attrs, required);

    let ident = &st.ident;
    let generics = st.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        #st

        impl #impl_generics ::uow_core::model::Model for #ident #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            type Key = #key_type;

            fn key(&self) -> ::core::option::Option<&Self::Key> { self.id.as_ref() }

            fn set_key(&mut self, key: Self::Key) { self.id = ::core::option::Option::Some(key); }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

struct ModelAttrConfig {
    table: Option<LitStr>,
    key_ty: Option<Type>,
}

impl Parse for ModelAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut table: Option<LitStr> = None;
        let mut key_ty: Option<Type> = None;

        let elems: Punctuated<ModelAttrElem, Token![,]> =
            Punctuated::<ModelAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                ModelAttrElem::Table(lit) => {
                    if table.is_some() {
                        return Err(syn::Error::new(
                            lit.span(),
                            "duplicate key 'table' in attribute",
                        ));
                    }
                    table = Some(lit);
                }
                ModelAttrElem::Key(ty) => {
                    if key_ty.is_some() {
                        return Err(syn::Error::new(
                            ty.span(),
                            "duplicate key 'key' in attribute",
                        ));
                    }
                    key_ty = Some(*ty);
                }
            }
        }

        Ok(Self { table, key_ty })
    }
}

enum ModelAttrElem {
    Table(LitStr),
    Key(Box<Type>),
}

impl Parse for ModelAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "table" {
            Ok(ModelAttrElem::Table(input.parse()?))
        } else if key == "key" {
            Ok(ModelAttrElem::Key(Box::new(input.parse()?)))
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'table' or 'key'",
            ))
        }
    }
}
