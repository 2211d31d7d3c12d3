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
        group::{Group, GroupSlug},
        post::Post,
    },
    pagination::Page,
};
use quill_db::{PostFilter, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(group_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}/", rejection(ServerError))]
pub struct GroupPostsPath {
    pub slug: GroupSlug,
}

#[derive(Clone, Debug, Serialize)]
pub struct GroupPostsContext {
    pub group: Group,
    pub page_obj: Page<Post>,
}

async fn group_posts(
    GroupPostsPath { slug }: GroupPostsPath,
    State(store): State<Arc<dyn Store>>,
    State(settings): State<Arc<Settings>>,
    page: PageQuery,
) -> Result<View<GroupPostsContext>> {
    let group = store
        .fetch_group_by_slug(&slug)
        .await?
        .ok_or(ServerError::GroupBySlugNotFound(slug))?;

    let page_obj = fetch_page(
        store.as_ref(),
        PostFilter::Group(group.id),
        settings.page_size,
        page.number(),
    )
    .await?;

    Ok(View::new(
        ViewName::GroupList,
        GroupPostsContext { group, page_obj },
    ))
}
