use crate::{
    config::Settings,
    server::{
        Result, ServerError, ServerRouter,
        routes::{PageQuery, fetch_page},
        view::{View, ViewName},
    },
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use quill_common::{
    model::{
        post::Post,
        user::{User, Username},
    },
    pagination::Page,
};
use quill_db::{PostFilter, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(profile)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/", rejection(ServerError))]
pub struct ProfilePath {
    pub username: Username,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProfileContext {
    pub author: User,
    pub page_obj: Page<Post>,
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    page: PageQuery,
) -> Result<View<ProfileContext>> {
    let author = store
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserByUsernameNotFound(username))?;

    let page_obj = fetch_page(
        store.as_ref(),
        PostFilter::Author(author.id),
        settings.page_size,
        page.number(),
    )
    .await?;

    Ok(View::new(
        ViewName::Profile,
        ProfileContext { author, page_obj },
    ))
}
