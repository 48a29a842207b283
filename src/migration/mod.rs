// migration/mod.rs
use sea_orm_migration::prelude::*;

mod m20261014_000001_create_users_and_posts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261014_000001_create_users_and_posts::Migration)]
    }
}
