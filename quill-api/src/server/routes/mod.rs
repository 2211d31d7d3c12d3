use crate::server::{Result, ServerRouter};
use axum::{Router, extract::FromRequestParts, http::request::Parts};
use quill_common::{
    model::post::Post,
    pagination::{Page, PageNumber, PageSize, PageWindow},
};
use quill_db::{PostFilter, Store};
use std::convert::Infallible;
use url::form_urlencoded;

pub mod groups;
pub mod posts;
pub mod profiles;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(groups::routes())
        .merge(profiles::routes())
}

/// The `?page=` parameter of paginated listings.
///
/// Extraction never fails. When the parameter is repeated the last value
/// counts, and anything unparsable falls back to the first page.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct PageQuery {
    page: Option<String>,
}

impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let page = parts.uri.query().and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .filter(|(key, _)| key == "page")
                .last()
                .map(|(_, value)| value.into_owned())
        });

        Ok(Self { page })
    }
}

impl PageQuery {
    #[must_use]
    pub fn number(&self) -> PageNumber {
        PageNumber::parse_lenient(self.page.as_deref())
    }
}

/// Load one newest-first page of the posts matching `filter`.
pub async fn fetch_page(
    store: &dyn Store,
    filter: PostFilter,
    page_size: PageSize,
    requested: PageNumber,
) -> Result<Page<Post>> {
    let total_count = store.count_posts(filter).await?;
    let window = PageWindow::locate(total_count, page_size, requested);
    let posts = store.fetch_posts(filter, window).await?;

    Ok(Page::new(window, posts))
}
