//! Rendering of handler results.
//!
//! Pages are answered as a view name plus the context the page is drawn
//! from, encoded as JSON. Turning that into markup is left to the client.

use crate::server::ServerError;
use axum::{
    Form, Json as AxumJson,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{TypedHeader, routing::TypedPath};
use headers::ContentType;
use serde::{Serialize, de::DeserializeOwned};

/// JSON body extractor and responder that reports failures as
/// [`ServerError`]s.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

/// A submitted form, read as an urlencoded HTML form when the request says
/// so and as JSON otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Submission<T>(pub T);

impl<S, T> FromRequest<S> for Submission<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .is_some_and(|media_type| {
                media_type
                    .trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            });

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
pub enum ViewName {
    #[serde(rename = "posts/index")]
    Index,
    #[serde(rename = "posts/group_list")]
    GroupList,
    #[serde(rename = "posts/profile")]
    Profile,
    #[serde(rename = "posts/post_detail")]
    PostDetail,
    #[serde(rename = "posts/create_post")]
    CreatePost,
}

#[derive(Clone, Debug, Serialize)]
pub struct View<C> {
    view: ViewName,
    context: C,
    #[serde(skip)]
    status: StatusCode,
}

impl<C: Serialize> View<C> {
    #[must_use]
    pub fn new(view: ViewName, context: C) -> Self {
        Self {
            view,
            context,
            status: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn with_status(self, status: StatusCode) -> Self {
        Self { status, ..self }
    }
}

impl<C: Serialize> IntoResponse for View<C> {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

/// `303 See Other` to a route of this site.
pub fn redirect_to(path: &impl TypedPath) -> Redirect {
    Redirect::to(&path.to_uri().to_string())
}
