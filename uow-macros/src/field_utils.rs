use proc_macro2::Span;
use syn::{Attribute, Field, FieldsNamed, Ident, Token, Type, punctuated::Punctuated};

fn is_named(field: &Field, name: &str) -> bool {
    field.ident.as_ref().is_some_and(|i| i == name)
}

/// 确保具名字段结构体以指定字段开头
/// - 字段已存在：复用原定义（含属性），仅移到最前
/// - 字段缺失：按给定类型与属性新建
pub(crate) fn ensure_leading_field(
    fields_named: &mut FieldsNamed,
    name: &str,
    ty: &Type,
    attrs: &[Attribute],
) {
    let old_named = std::mem::take(&mut fields_named.named);
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    match old_named.iter().find(|f| is_named(f, name)) {
        Some(existing) => new_named.push(existing.clone()),
        None => {
            let ident = Ident::new(name, Span::call_site());
            let field: Field = syn::parse_quote! { #(#attrs)* pub #ident: #ty };
            new_named.push(field);
        }
    }

    // 其余字段保持原始顺序
    for f in old_named.into_iter().filter(|f| !is_named(f, name)) {
        new_named.push(f);
    }

    fields_named.named = new_named;
}
