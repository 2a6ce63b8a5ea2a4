//! # Demo Entities
//!
//! A small blog model used by the seed binary and the integration tests.
//!
//! ```text
//! Author 1 ──── * Post * ──── * Tag
//!        posts    author  tags
//!                 (owns author_id, owns post_tag)
//! ```

use strata_core::{
    ColumnDescriptor, ColumnType, CoreResult, Entity, EntityMetadata, Record, RelationDescriptor,
    TableDescriptor,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
    pub posts: Vec<Post>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Author {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Entity for Author {
    const NAME: &'static str = "Author";

    fn describe() -> CoreResult<EntityMetadata> {
        EntityMetadata::builder(Self::NAME)
            .table(TableDescriptor::derived(Self::NAME))
            .column(ColumnDescriptor::id("id"))
            .column(ColumnDescriptor::builder("name", ColumnType::Varchar).length(100))
            .relation(RelationDescriptor::one_to_many("posts", "Post", "author"))
            .build()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.clone())
    }

    fn from_record(record: Record) -> CoreResult<Self> {
        Ok(Author {
            id: record.get_i64("id")?,
            name: record.require_string("name")?,
            posts: Vec::new(),
        })
    }

    fn attach_relation(&mut self, property: &str, related: Vec<Record>) -> CoreResult<()> {
        if property == "posts" {
            self.posts = related
                .into_iter()
                .map(Post::from_record)
                .collect::<CoreResult<_>>()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub author_id: Option<i64>,
    pub author: Option<Author>,
    pub tags: Vec<Tag>,
}

impl Post {
    pub fn new(title: impl Into<String>, author_id: Option<i64>) -> Self {
        Post {
            title: title.into(),
            author_id,
            ..Default::default()
        }
    }
}

impl Entity for Post {
    const NAME: &'static str = "Post";

    fn describe() -> CoreResult<EntityMetadata> {
        EntityMetadata::builder(Self::NAME)
            .table(TableDescriptor::derived(Self::NAME))
            .column(ColumnDescriptor::id("id"))
            .column(ColumnDescriptor::builder("title", ColumnType::Varchar).length(200))
            .relation(RelationDescriptor::many_to_one("author", "Author"))
            .relation(RelationDescriptor::many_to_many("tags", "Tag").owner())
            .build()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("title", self.title.clone())
            .with("author_id", self.author_id)
    }

    fn from_record(record: Record) -> CoreResult<Self> {
        Ok(Post {
            id: record.get_i64("id")?,
            title: record.require_string("title")?,
            author_id: record.get_i64("author_id")?,
            author: None,
            tags: Vec::new(),
        })
    }

    fn attach_relation(&mut self, property: &str, related: Vec<Record>) -> CoreResult<()> {
        match property {
            "author" => {
                self.author = related
                    .into_iter()
                    .next()
                    .map(Author::from_record)
                    .transpose()?;
            }
            "tags" => {
                self.tags = related
                    .into_iter()
                    .map(Tag::from_record)
                    .collect::<CoreResult<_>>()?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            id: None,
            name: name.into(),
        }
    }
}

impl Entity for Tag {
    const NAME: &'static str = "Tag";

    fn describe() -> CoreResult<EntityMetadata> {
        EntityMetadata::builder(Self::NAME)
            .table(TableDescriptor::derived(Self::NAME))
            .column(ColumnDescriptor::id("id"))
            .column(
                ColumnDescriptor::builder("name", ColumnType::Varchar)
                    .length(50)
                    .unique(),
            )
            .build()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.clone())
    }

    fn from_record(record: Record) -> CoreResult<Self> {
        Ok(Tag {
            id: record.get_i64("id")?,
            name: record.require_string("name")?,
        })
    }
}
