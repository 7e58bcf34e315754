use serde::{Deserialize, Serialize};
use uow_core::model::Model;
use uow_macros::model;

#[model(table = "items")]
struct ItemRow {
    title: String,
    owner_id: i64,
}

// 已有的 serde 派生与 id 字段会被保留并去重
#[model(table = "accounts", key = u32)]
#[derive(Serialize, Deserialize)]
struct AccountRow {
    email: String,
    #[serde(default)]
    id: Option<u32>,
}

fn main() {
    assert_eq!(ItemRow::TABLE, "items");
    let mut row: ItemRow = serde_json::from_str(r#"{"title": "book", "owner_id": 1}"#).unwrap();
    assert_eq!(row.key(), None);
    row.set_key(3);
    assert_eq!(row.clone(), row);
    assert_eq!(row.key(), Some(&3));

    let account = AccountRow {
        id: Some(1),
        email: "a@x.io".into(),
    };
    assert_eq!(AccountRow::TABLE, "accounts");
    assert_eq!(account.key(), Some(&1u32));
    let _ = format!("{:?}", account);
}
