use uow_core::entity::Entity;
use uow_macros::entity;

#[entity]
struct Task {
    title: String,
    done: bool,
}

#[entity(id = String, debug = false)]
struct Tag {
    label: String,
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag({})", self.label)
    }
}

fn main() {
    let mut task = Task {
        id: None,
        title: "write docs".into(),
        done: false,
    };
    assert!(task.is_transient());
    task.assign_id(7);
    assert_eq!(task.id(), Some(&7i64));
    let _ = format!("{:?} {}", task, task.done);

    let tag = Tag {
        id: Some("rust".into()),
        label: "Rust".into(),
    };
    assert_eq!(tag.id().map(String::as_str), Some("rust"));
    let _ = format!("{:?}", tag);
}
