use sqlx::{Error as SqlxError, Postgres, Transaction};
use tracing::{info, instrument};

use crate::database::connection::DbConnection;

impl DbConnection {
    pub async fn init_schema(&self) -> Result<(), SqlxError> {
        let mut transaction = self.pool().begin().await?;
        create_all_types(&mut transaction).await?;
        create_all_tables(&mut transaction).await?;
        transaction.commit().await?;
        info!("database schema created");
        Ok(())
    }

    pub async fn drop_schema(&self) -> Result<(), SqlxError> {
        let mut transaction = self.pool().begin().await?;
        drop_all_tables(&mut transaction).await?;
        drop_all_types(&mut transaction).await?;
        transaction.commit().await?;
        info!("database schema dropped");
        Ok(())
    }
}

#[instrument(skip_all)]
pub async fn create_all_types(
    transaction: &mut Transaction<'_, Postgres>,
) -> Result<(), SqlxError> {
    sqlx::query("CREATE TYPE resource_kind AS ENUM ('task', 'pipeline');")
        .execute(transaction.as_mut())
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn drop_all_types(transaction: &mut Transaction<'_, Postgres>) -> Result<(), SqlxError> {
    sqlx::query("DROP TYPE IF EXISTS resource_kind;")
        .execute(transaction.as_mut())
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_all_tables(
    transaction: &mut Transaction<'_, Postgres>,
) -> Result<(), SqlxError> {
    sqlx::query(
        "
            CREATE TABLE users (
                id              bigint PRIMARY KEY,
                username        VARCHAR(39) NOT NULL,
                access_token    TEXT NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL
            );
        ",
    )
    .execute(transaction.as_mut())
    .await?;
    sqlx::query(
        "
            CREATE TABLE resources (
                id                  bigint PRIMARY KEY GENERATED ALWAYS AS IDENTITY,
                name                VARCHAR(100) NOT NULL,
                description         VARCHAR(1000) NOT NULL,
                kind                resource_kind NOT NULL,
                uploader_id         bigint NOT NULL REFERENCES users(id),
                github_owner        VARCHAR(100) NOT NULL,
                github_repository   VARCHAR(100) NOT NULL,
                github_path         VARCHAR(255) NOT NULL,
                download_count      bigint NOT NULL DEFAULT 0 CHECK (download_count >= 0),
                rating_count        bigint NOT NULL DEFAULT 0 CHECK (rating_count >= 0),
                rating_sum          bigint NOT NULL DEFAULT 0 CHECK (rating_sum >= 0),
                created_at          TIMESTAMPTZ NOT NULL
            );
        ",
    )
    .execute(transaction.as_mut())
    .await?;
    sqlx::query(
        "
            CREATE TABLE resource_tags (
                resource_id     bigint NOT NULL REFERENCES resources(id) ON UPDATE CASCADE ON DELETE CASCADE,
                tag             TEXT NOT NULL,
                CONSTRAINT resource_tag_pkey PRIMARY KEY (resource_id, tag)
            );
        ",
    )
    .execute(transaction.as_mut())
    .await?;
    sqlx::query("CREATE INDEX resource_tags_tag_idx ON resource_tags (tag);")
        .execute(transaction.as_mut())
        .await?;
    sqlx::query(
        "
            CREATE TABLE ratings (
                user_id         bigint NOT NULL REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE,
                resource_id     bigint NOT NULL REFERENCES resources(id) ON UPDATE CASCADE ON DELETE CASCADE,
                stars           smallint NOT NULL CHECK (stars BETWEEN 1 AND 5),
                rated_at        TIMESTAMPTZ NOT NULL,
                CONSTRAINT rating_pkey PRIMARY KEY (user_id, resource_id)
            );
        ",
    )
    .execute(transaction.as_mut())
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn drop_all_tables(transaction: &mut Transaction<'_, Postgres>) -> Result<(), SqlxError> {
    let statements = [
        "DROP TABLE IF EXISTS ratings;",
        "DROP TABLE IF EXISTS resource_tags;",
        "DROP TABLE IF EXISTS resources;",
        "DROP TABLE IF EXISTS users;",
    ];
    for statement in &statements {
        sqlx::query(statement).execute(transaction.as_mut()).await?;
    }
    Ok(())
}
