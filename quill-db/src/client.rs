use crate::{
    record::{AuthenticationRecord, FullPostRecord, GroupRecord, UserRecord},
    store::{DbError, PostFilter, Result, Store},
};
use async_trait::async_trait;
use quill_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication},
        group::{CreateGroup, Group, GroupSlug},
        post::{CreatePost, Post, PostContent, PostMarker},
        user::{CreateUser, User, UserMarker, Username},
    },
    pagination::PageWindow,
};
use sqlx::{
    PgPool,
    migrate::Migrator,
    postgres::PgPoolOptions,
    query, query_as, query_scalar,
};
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Joins a post row (aliased `posts`) with its author and group, in the
/// column layout of [`FullPostRecord`].
const FULL_POST_COLUMNS: &str = "
    posts.post_id,
    posts.text,
    posts.pub_date,
    users.user_id,
    users.username,
    groups.group_id,
    groups.title AS group_title,
    groups.slug AS group_slug,
    groups.description AS group_description
";

const FULL_POST_JOINS: &str = "
    JOIN users.users ON users.user_id = posts.user_id
    LEFT JOIN posts.groups ON groups.group_id = posts.group_id
";

/// `$1` restricts to a group, `$2` to an author; `NULL` lifts the restriction.
const POST_FILTER: &str = "
    ($1::BIGINT IS NULL OR posts.group_id = $1)
    AND ($2::BIGINT IS NULL OR posts.user_id = $2)
";

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database migrations are up to date");
        Ok(())
    }
}

fn filter_binds(filter: PostFilter) -> (Option<i64>, Option<i64>) {
    match filter {
        PostFilter::All => (None, None),
        PostFilter::Group(group_id) => (Some(group_id.get()), None),
        PostFilter::Author(user_id) => (None, Some(user_id.get())),
    }
}

/// Turn constraint violations into the store's own error variants.
///
/// `entity` names what was being written. Foreign key violations report the
/// referenced table instead, read off the violated constraint's name.
fn constraint_error(err: sqlx::Error, entity: &'static str) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DbError::Duplicate(entity);
        }
        if db_err.is_foreign_key_violation() {
            let referenced = match db_err.constraint() {
                Some(constraint) if constraint.ends_with("group_id_fkey") => "group",
                _ => "user",
            };
            return DbError::MissingReference(referenced);
        }
    }
    DbError::Sqlx(err)
}

#[async_trait]
impl Store for DbClient {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users.users
            WHERE
                users.user_id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users.users
            WHERE
                users.username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (username)
            VALUES ($1)
            RETURNING user_id, username
            ",
        )
        .bind(user.username.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "user"))?;

        Ok(User::try_from(record)?)
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT
                groups.group_id,
                groups.title,
                groups.slug,
                groups.description
            FROM
                posts.groups
            WHERE
                groups.slug = $1
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let records = query_as::<_, GroupRecord>(
            "
            SELECT
                groups.group_id,
                groups.title,
                groups.slug,
                groups.description
            FROM
                posts.groups
            ORDER BY
                groups.group_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let groups = records
            .into_iter()
            .map(Group::try_from)
            .collect::<Result<_, _>>()?;
        Ok(groups)
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let record = query_as::<_, GroupRecord>(
            "
            INSERT INTO posts.groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING group_id, title, slug, description
            ",
        )
        .bind(group.title.get())
        .bind(group.slug.get())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "group"))?;

        Ok(Group::try_from(record)?)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {FULL_POST_COLUMNS} FROM posts.posts {FULL_POST_JOINS} WHERE posts.post_id = $1"
        );
        let record = query_as::<_, FullPostRecord>(&sql)
            .bind(post_id.get())
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let (group_id, user_id) = filter_binds(filter);
        let sql = format!("SELECT COUNT(*) FROM posts.posts WHERE {POST_FILTER}");
        let count: i64 = query_scalar(&sql)
            .bind(group_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn fetch_posts(&self, filter: PostFilter, window: PageWindow) -> Result<Vec<Post>> {
        let (group_id, user_id) = filter_binds(filter);
        let sql = format!(
            "
            SELECT {FULL_POST_COLUMNS}
            FROM posts.posts {FULL_POST_JOINS}
            WHERE {POST_FILTER}
            ORDER BY posts.pub_date DESC, posts.post_id DESC
            LIMIT $3 OFFSET $4
            "
        );
        let records = query_as::<_, FullPostRecord>(&sql)
            .bind(group_id)
            .bind(user_id)
            .bind(i64::try_from(window.limit()).unwrap_or(i64::MAX))
            .bind(i64::try_from(window.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let sql = format!(
            "
            WITH posts AS (
                INSERT INTO posts.posts (text, user_id, group_id)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {FULL_POST_COLUMNS} FROM posts {FULL_POST_JOINS}
            "
        );
        let record = query_as::<_, FullPostRecord>(&sql)
            .bind(post.content.text.get())
            .bind(post.author.get())
            .bind(post.content.group.map(Id::get))
            .fetch_one(&self.pool)
            .await
            .map_err(|err| constraint_error(err, "post"))?;

        Ok(Post::try_from(record)?)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let sql = format!(
            "
            WITH posts AS (
                UPDATE posts.posts
                SET text = $2, group_id = $3
                WHERE post_id = $1
                RETURNING *
            )
            SELECT {FULL_POST_COLUMNS} FROM posts {FULL_POST_JOINS}
            "
        );
        let record = query_as::<_, FullPostRecord>(&sql)
            .bind(post_id.get())
            .bind(content.text.get())
            .bind(content.group.map(Id::get))
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| constraint_error(err, "post"))?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_id,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                users.authentications
            WHERE
                authentications.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO users.authentications
                (token_hash, user_id, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.get())
        .bind(authentication.created_at)
        .bind(
            authentication
                .expires_after
                .map(|lifetime| lifetime.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "authentication"))?;

        Ok(())
    }
}
