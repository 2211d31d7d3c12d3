use crate::store::{DbError, PostFilter, Result, Store};
use async_trait::async_trait;
use quill_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication},
        group::{CreateGroup, Group, GroupMarker, GroupSlug},
        post::{CreatePost, Post, PostContent, PostMarker, PostText},
        user::{CreateUser, User, UserMarker, Username},
    },
    pagination::PageWindow,
};
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// [`Store`] kept entirely in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<Id<UserMarker>, User>,
    groups: BTreeMap<Id<GroupMarker>, Group>,
    posts: BTreeMap<Id<PostMarker>, PostRow>,
    authentications: HashMap<AuthTokenHash, Authentication>,
}

#[derive(Clone, Debug)]
struct PostRow {
    id: Id<PostMarker>,
    text: PostText,
    pub_date: OffsetDateTime,
    author: Id<UserMarker>,
    group: Option<Id<GroupMarker>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn allocate_id<Marker>(&mut self) -> Id<Marker> {
        self.next_id += 1;
        Id::new(self.next_id)
    }

    fn check_group(&self, group: Option<Id<GroupMarker>>) -> Result<()> {
        match group {
            Some(group_id) if !self.groups.contains_key(&group_id) => {
                Err(DbError::MissingReference("group"))
            }
            _ => Ok(()),
        }
    }

    fn join(&self, row: &PostRow) -> Result<Post> {
        let author = self
            .users
            .get(&row.author)
            .cloned()
            .ok_or(DbError::MissingReference("user"))?;
        let group = row
            .group
            .map(|group_id| {
                self.groups
                    .get(&group_id)
                    .cloned()
                    .ok_or(DbError::MissingReference("group"))
            })
            .transpose()?;

        Ok(Post {
            id: row.id,
            text: row.text.clone(),
            pub_date: row.pub_date,
            author,
            group,
        })
    }

    /// Matching rows, newest first.
    fn filtered(&self, filter: PostFilter) -> Vec<&PostRow> {
        let mut rows: Vec<&PostRow> = self
            .posts
            .values()
            .filter(|row| match filter {
                PostFilter::All => true,
                PostFilter::Group(group_id) => row.group == Some(group_id),
                PostFilter::Author(user_id) => row.author == user_id,
            })
            .collect();
        rows.sort_by(|a, b| (b.pub_date, b.id).cmp(&(a.pub_date, a.id)));
        rows
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        let user = tables
            .users
            .values()
            .find(|user| &user.username == username)
            .cloned();
        Ok(user)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|known| known.username == user.username) {
            return Err(DbError::Duplicate("user"));
        }

        let user = User {
            id: tables.allocate_id(),
            username: user.username.clone(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        let group = tables
            .groups
            .values()
            .find(|group| &group.slug == slug)
            .cloned();
        Ok(group)
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        Ok(self.tables.read().await.groups.values().cloned().collect())
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|known| known.slug == group.slug) {
            return Err(DbError::Duplicate("group"));
        }

        let group = Group {
            id: tables.allocate_id(),
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&post_id)
            .map(|row| tables.join(row))
            .transpose()
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.filtered(filter).len() as u64)
    }

    async fn fetch_posts(&self, filter: PostFilter, window: PageWindow) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit()).unwrap_or(usize::MAX);

        tables
            .filtered(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| tables.join(row))
            .collect()
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author) {
            return Err(DbError::MissingReference("user"));
        }
        tables.check_group(post.content.group)?;

        let row = PostRow {
            id: tables.allocate_id(),
            text: post.content.text.clone(),
            pub_date: OffsetDateTime::now_utc(),
            author: post.author,
            group: post.content.group,
        };
        let created = tables.join(&row)?;
        tables.posts.insert(row.id, row);
        Ok(created)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        tables.check_group(content.group)?;

        let Some(row) = tables.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        row.text = content.text.clone();
        row.group = content.group;
        let row = row.clone();

        tables.join(&row).map(Some)
    }

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let tables = self.tables.read().await;
        Ok(tables.authentications.get(token_hash).cloned())
    }

    async fn create_authentication(&self, authentication: &Authentication) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&authentication.user) {
            return Err(DbError::MissingReference("user"));
        }
        if tables.authentications.contains_key(&authentication.token_hash) {
            return Err(DbError::Duplicate("authentication"));
        }

        tables
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());
        Ok(())
    }
}
