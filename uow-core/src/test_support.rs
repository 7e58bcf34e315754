use crate::adapter::Adapter;
use crate::entity::Entity;
use crate::model::Model;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ArticleRow {
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
}

impl Model for ArticleRow {
    const TABLE: &'static str = "articles";
    type Key = i64;

    fn key(&self) -> Option<&Self::Key> {
        self.id.as_ref()
    }

    fn set_key(&mut self, key: Self::Key) {
        self.id = Some(key);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Article {
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
}

impl Article {
    pub fn draft(title: &str) -> Self {
        Self {
            id: None,
            title: title.into(),
            slug: title.to_lowercase().replace(' ', "-"),
        }
    }
}

impl Entity for Article {
    type Id = i64;

    fn id(&self) -> Option<&Self::Id> {
        self.id.as_ref()
    }

    fn assign_id(&mut self, id: Self::Id) {
        self.id = Some(id);
    }
}

pub(crate) struct ArticleAdapter;

impl Adapter for ArticleAdapter {
    type Model = ArticleRow;
    type Entity = Article;

    fn to_entity(&self, model: ArticleRow) -> Article {
        Article {
            id: model.id,
            title: model.title,
            slug: model.slug,
        }
    }

    fn to_model(&self, entity: &Article) -> ArticleRow {
        ArticleRow {
            id: entity.id,
            title: entity.title.clone(),
            slug: entity.slug.clone(),
        }
    }
}
