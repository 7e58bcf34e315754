use uow_core::entity::IdentityKey;
use uow_macros::entity_id;

#[entity_id]
struct UserId(i64);

#[entity_id(debug = false)]
struct Slug(String);

impl std::fmt::Debug for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Slug(..)")
    }
}

fn main() {
    let id = UserId::new(42);
    assert_eq!(id.to_string(), "42");
    assert_eq!("42".parse::<UserId>().unwrap(), id);
    assert_eq!(UserId::from_sequence(5), Some(UserId(5)));
    let raw: i64 = id.clone().into();
    assert_eq!(raw, 42);
    let _ = format!("{:?}", id);

    let slug = Slug::from_sequence(9).unwrap();
    assert_eq!(slug.as_ref(), "9");
    let _ = format!("{:?}", slug);
}
