//! Access checks run at the top of the mutating handlers.
//!
//! Each guard either lets the request through or hands back the redirect the
//! handler should answer with instead.

use crate::{
    config::Settings,
    server::{auth::AuthenticatedUser, routes::posts::PostDetailPath, view::redirect_to},
};
use axum::{http::Uri, response::Redirect};
use quill_common::model::post::Post;
use tracing::debug;
use url::form_urlencoded;

/// Require a signed-in user, sending anonymous visitors to the login page
/// with a `next` parameter pointing back at `current`.
pub fn require_login(
    requester: Option<AuthenticatedUser>,
    settings: &Settings,
    current: &Uri,
) -> Result<AuthenticatedUser, Redirect> {
    requester.ok_or_else(|| {
        debug!(%current, "Anonymous request needs login");
        Redirect::to(&login_location(&settings.login_url, current))
    })
}

/// Require `user` to have written `post`. Anyone else is sent back to the
/// post's page without further notice.
pub fn require_author(user: AuthenticatedUser, post: &Post) -> Result<(), Redirect> {
    if post.is_authored_by(user.user_id()) {
        Ok(())
    } else {
        debug!(post_id = %post.id, user_id = %user.user_id(), "Not the author, redirecting");
        Err(redirect_to(&PostDetailPath { id: post.id }))
    }
}

fn login_location(login_url: &str, next: &Uri) -> String {
    let next = next
        .path_and_query()
        .map_or_else(|| next.path(), |path_and_query| path_and_query.as_str());
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    let separator = if login_url.contains('?') { '&' } else { '?' };

    format!("{login_url}{separator}{query}")
}
