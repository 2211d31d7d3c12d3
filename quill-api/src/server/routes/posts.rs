use crate::{
    config::Settings,
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        guard::{require_author, require_login},
        routes::{PageQuery, fetch_page, profiles::ProfilePath},
        view::{Submission, View, ViewName, redirect_to},
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::{
    form::{PostForm, PostFormInput},
    model::{
        Id,
        post::{CreatePost, Post, PostMarker},
    },
    pagination::Page,
};
use quill_db::{PostFilter, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(post_detail)
        .typed_get(create_post_form)
        .typed_post(create_post)
        .typed_get(edit_post_form)
        .typed_post(edit_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
pub struct IndexPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
pub struct PostDetailPath {
    pub id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create/", rejection(ServerError))]
pub struct CreatePostPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit/", rejection(ServerError))]
pub struct EditPostPath {
    pub id: Id<PostMarker>,
}

#[derive(Clone, Debug, Serialize)]
pub struct IndexContext {
    pub page_obj: Page<Post>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PostDetailContext {
    pub post: Post,
}

/// Context of the create/edit page. `post` is only set when editing.
#[derive(Clone, Debug, Serialize)]
pub struct PostFormContext {
    pub form: PostForm,
    pub is_edit: bool,
    pub post: Option<Post>,
}

async fn index(
    IndexPath(): IndexPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    page: PageQuery,
) -> Result<View<IndexContext>> {
    let page_obj = fetch_page(
        store.as_ref(),
        PostFilter::All,
        settings.page_size,
        page.number(),
    )
    .await?;

    Ok(View::new(ViewName::Index, IndexContext { page_obj }))
}

async fn post_detail(
    PostDetailPath { id }: PostDetailPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<View<PostDetailContext>> {
    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(View::new(ViewName::PostDetail, PostDetailContext { post }))
}

async fn create_post_form(
    path: CreatePostPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    requester: Option<AuthenticatedUser>,
) -> Result<Response> {
    if let Err(redirect) = require_login(requester, &settings, &path.to_uri()) {
        return Ok(redirect.into_response());
    }

    let groups = store.fetch_groups().await?;
    let context = PostFormContext {
        form: PostForm::blank(&groups),
        is_edit: false,
        post: None,
    };

    Ok(View::new(ViewName::CreatePost, context).into_response())
}

async fn create_post(
    path: CreatePostPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    requester: Option<AuthenticatedUser>,
    body: Result<Submission<PostFormInput>>,
) -> Result<Response> {
    let user = match require_login(requester, &settings, &path.to_uri()) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect.into_response()),
    };
    let Submission(input) = body?;

    let groups = store.fetch_groups().await?;
    let content = match PostForm::validate(&input, &groups) {
        Ok(content) => content,
        Err(errors) => {
            debug!(user_id = %user.user_id(), ?errors, "Rejected new post");
            let context = PostFormContext {
                form: PostForm::bound(input, errors, &groups),
                is_edit: false,
                post: None,
            };
            return Ok(View::new(ViewName::CreatePost, context)
                .with_status(StatusCode::UNPROCESSABLE_ENTITY)
                .into_response());
        }
    };

    let post = store
        .create_post(&CreatePost {
            author: user.user_id(),
            content,
        })
        .await?;
    info!(post_id = %post.id, author = %post.author.username, "Created post");

    let profile = ProfilePath {
        username: post.author.username,
    };
    Ok(redirect_to(&profile).into_response())
}

async fn edit_post_form(
    path: EditPostPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    requester: Option<AuthenticatedUser>,
) -> Result<Response> {
    let user = match require_login(requester, &settings, &path.to_uri()) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let post = store
        .fetch_post(path.id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(path.id))?;
    if let Err(redirect) = require_author(user, &post) {
        return Ok(redirect.into_response());
    }

    let groups = store.fetch_groups().await?;
    let context = PostFormContext {
        form: PostForm::from_post(&post, &groups),
        is_edit: true,
        post: Some(post),
    };

    Ok(View::new(ViewName::CreatePost, context).into_response())
}

async fn edit_post(
    path: EditPostPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    requester: Option<AuthenticatedUser>,
    body: Result<Submission<PostFormInput>>,
) -> Result<Response> {
    let user = match require_login(requester, &settings, &path.to_uri()) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let post = store
        .fetch_post(path.id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(path.id))?;
    if let Err(redirect) = require_author(user, &post) {
        return Ok(redirect.into_response());
    }
    let Submission(input) = body?;

    let groups = store.fetch_groups().await?;
    let content = match PostForm::validate(&input, &groups) {
        Ok(content) => content,
        Err(errors) => {
            debug!(post_id = %post.id, ?errors, "Rejected post edit");
            let context = PostFormContext {
                form: PostForm::bound(input, errors, &groups),
                is_edit: true,
                post: Some(post),
            };
            return Ok(View::new(ViewName::CreatePost, context)
                .with_status(StatusCode::UNPROCESSABLE_ENTITY)
                .into_response());
        }
    };

    let updated = store
        .update_post(path.id, &content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(path.id))?;
    info!(post_id = %updated.id, "Updated post");

    Ok(redirect_to(&PostDetailPath { id: updated.id }).into_response())
}
