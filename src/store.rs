// store.rs
use sea_orm::{
    ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryOrder, Set, SqlErr,
};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use thiserror::Error;

use crate::entities::{Post, User, post, user};
use crate::migration::Migrator;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("user {0} not found")]
    UserNotFound(i32),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A post together with its owner's username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthoredPost {
    pub post: post::Model,
    pub username: Option<String>,
}

/// Snapshot of both tables, loaded from each side of the relation.
#[derive(Clone, Debug)]
pub struct Verification {
    pub users_count: u64,
    pub posts_count: u64,
    pub users: Vec<(user::Model, Vec<post::Model>)>,
    pub posts: Vec<(post::Model, Option<user::Model>)>,
}

impl Verification {
    /// Every post has an author, and that author lists the post among its own.
    pub fn is_consistent(&self) -> bool {
        self.posts.iter().all(|(post, author)| {
            let Some(author) = author else {
                return false;
            };
            author.id == post.user_id
                && self
                    .users
                    .iter()
                    .any(|(u, posts)| u.id == author.id && posts.iter().any(|p| p.id == post.id))
        })
    }
}

/// Lifetime and idle limit for the single in-memory connection.
const MEMORY_CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

// Each connection to :memory: opens a separate database, and recycling the
// only one wipes it, so the pool holds exactly one connection for good.
fn connect_options(url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(url);
    if url.contains(":memory:") {
        options
            .max_connections(1)
            .min_connections(1)
            .max_lifetime(MEMORY_CONNECTION_LIFETIME)
            .idle_timeout(MEMORY_CONNECTION_LIFETIME);
    }
    options
}

/// Handle to the relational store. Cloning shares the underlying pool.
#[derive(Clone, Debug)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(url: &str) -> Result<Self, DbErr> {
        let db = Database::connect(connect_options(url)).await?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> Result<(), DbErr> {
        Migrator::up(&self.db, None).await
    }

    /// Drops every table created by [`Store::migrate`].
    pub async fn teardown(&self) -> Result<(), DbErr> {
        Migrator::down(&self.db, None).await
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn list_users(&self) -> StoreResult<Vec<user::Model>> {
        Ok(User::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_user(&self, id: i32) -> StoreResult<user::Model> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::UserNotFound(id))
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
    ) -> StoreResult<user::Model> {
        if username.is_empty() {
            return Err(StoreError::Validation("Username is required".into()));
        }
        let email = email.filter(|e| !e.is_empty()).map(str::to_owned);

        let am = user::ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email),
            ..Default::default()
        };
        let created = am.insert(&self.db).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                StoreError::Conflict("Username or email already exists".into())
            }
            _ => StoreError::Database(err),
        })?;
        tracing::info!(user_id = created.id, username = %created.username, "user created");
        Ok(created)
    }

    pub async fn list_posts(&self) -> StoreResult<Vec<AuthoredPost>> {
        let rows = Post::find()
            .find_also_related(User)
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(post, author)| AuthoredPost {
                post,
                username: author.map(|u| u.username),
            })
            .collect())
    }

    pub async fn get_posts_for_user(
        &self,
        id: i32,
    ) -> StoreResult<(user::Model, Vec<post::Model>)> {
        let user = self.get_user(id).await?;
        let posts = user
            .find_related(Post)
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await?;
        Ok((user, posts))
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        user_id: i32,
    ) -> StoreResult<AuthoredPost> {
        if title.is_empty() || content.is_empty() {
            return Err(StoreError::Validation(
                "Title, content, and user_id are required".into(),
            ));
        }
        let author = self.get_user(user_id).await?;

        let am = post::ActiveModel {
            title: Set(title.to_owned()),
            content: Set(content.to_owned()),
            user_id: Set(author.id),
            ..Default::default()
        };
        let created = am.insert(&self.db).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => StoreError::UserNotFound(user_id),
            _ => StoreError::Database(err),
        })?;
        tracing::info!(post_id = created.id, user_id, "post created");
        Ok(AuthoredPost {
            post: created,
            username: Some(author.username),
        })
    }

    pub async fn verify(&self) -> StoreResult<Verification> {
        let users_count = User::find().count(&self.db).await?;
        let posts_count = Post::find().count(&self.db).await?;
        let users = User::find()
            .find_with_related(Post)
            .order_by_asc(user::Column::Id)
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await?;
        let posts = Post::find()
            .find_also_related(User)
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await?;
        Ok(Verification {
            users_count,
            posts_count,
            users,
            posts,
        })
    }
}
