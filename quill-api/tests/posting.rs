mod common;

use axum::http::StatusCode;
use common::TestApp;
use quill_common::form::REQUIRED_MESSAGE;
use serde_json::json;

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let post = app.post(&author, "original", None).await;
    let edit_uri = format!("/posts/{}/edit/", post.id);

    let form = app.get("/create/", None).await;
    assert_eq!(form.status, StatusCode::SEE_OTHER);
    assert_eq!(
        form.location.as_deref(),
        Some("/auth/login/?next=%2Fcreate%2F")
    );

    let submit = app
        .submit("/create/", None, &json!({ "text": "sneaky" }))
        .await;
    assert_eq!(submit.status, StatusCode::SEE_OTHER);
    assert_eq!(app.post_count().await, 1);

    let edit = app
        .submit(&edit_uri, None, &json!({ "text": "sneaky" }))
        .await;
    assert_eq!(edit.status, StatusCode::SEE_OTHER);
    assert_eq!(
        edit.location,
        Some(format!("/auth/login/?next=%2Fposts%2F{}%2Fedit%2F", post.id))
    );
    assert_eq!(app.stored_post(&post).await, post);
}

#[tokio::test]
async fn anonymous_edit_of_missing_post_still_asks_for_login() {
    let app = TestApp::new();

    let reply = app.get("/posts/999/edit/", None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn create_form_lists_fields_and_groups() {
    let app = TestApp::new();
    let user = app.user("leo").await;
    let token = app.login(&user).await;
    let group = app.group("cats").await;

    let reply = app.get("/create/", Some(&token)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.view(), "posts/create_post");
    let context = reply.context();
    assert_eq!(context["is_edit"], json!(false));
    assert_eq!(context["post"], json!(null));

    let form = &context["form"];
    assert_eq!(form["fields"][0]["name"], json!("text"));
    assert_eq!(form["fields"][0]["kind"], json!("text"));
    assert_eq!(form["fields"][0]["required"], json!(true));
    assert_eq!(form["fields"][1]["name"], json!("group"));
    assert_eq!(form["fields"][1]["kind"], json!("group_choice"));
    assert_eq!(form["fields"][1]["required"], json!(false));
    assert_eq!(
        form["group_choices"],
        json!([{ "id": group.id.get(), "title": "Group cats" }])
    );
    assert_eq!(form["errors"], json!({}));
}

#[tokio::test]
async fn creating_a_post_attributes_it_to_the_requester() {
    let app = TestApp::new();
    let user = app.user("NoName").await;
    let token = app.login(&user).await;
    let group = app.group("cats").await;

    let reply = app
        .submit(
            "/create/",
            Some(&token),
            &json!({ "text": "  fresh words  ", "group": group.id.get() }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/profile/NoName/"));
    assert_eq!(app.post_count().await, 1);

    let profile = app.get("/profile/NoName/", None).await;
    let created = &profile.context()["page_obj"]["items"][0];
    assert_eq!(created["text"], json!("fresh words"));
    assert_eq!(created["author"]["id"], json!(user.id.get()));
    assert_eq!(created["group"]["id"], json!(group.id.get()));
}

#[tokio::test]
async fn group_may_be_left_empty() {
    let app = TestApp::new();
    let user = app.user("leo").await;
    let token = app.login(&user).await;

    for form in [
        json!({ "text": "no group" }),
        json!({ "text": "empty group", "group": "" }),
        json!({ "text": "null group", "group": null }),
    ] {
        let reply = app.submit("/create/", Some(&token), &form).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER, "{form}");
    }

    let index = app.get("/", None).await;
    let items = index.context()["page_obj"]["items"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| item["group"].is_null()));
}

#[tokio::test]
async fn invalid_submission_is_shown_again_with_errors() {
    let app = TestApp::new();
    let user = app.user("leo").await;
    let token = app.login(&user).await;

    let reply = app
        .submit("/create/", Some(&token), &json!({ "text": "   ", "group": 42 }))
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.view(), "posts/create_post");
    let context = reply.context();
    assert_eq!(context["is_edit"], json!(false));
    assert_eq!(context["form"]["errors"]["text"], json!([REQUIRED_MESSAGE]));
    assert!(context["form"]["errors"]["group"].is_array());
    assert_eq!(context["form"]["values"]["group"], json!(42));
    assert_eq!(app.post_count().await, 0);
}

#[tokio::test]
async fn html_form_posts_are_accepted() {
    let app = TestApp::new();
    let user = app.user("leo").await;
    let token = app.login(&user).await;
    let group = app.group("cats").await;

    let plain = app
        .submit_urlencoded("/create/", Some(&token), "text=hello&group=")
        .await;
    assert_eq!(plain.status, StatusCode::SEE_OTHER);
    assert_eq!(plain.location.as_deref(), Some("/profile/leo/"));

    let grouped = app
        .submit_urlencoded(
            "/create/",
            Some(&token),
            &format!("text=with+a+group&group={}", group.id),
        )
        .await;
    assert_eq!(grouped.status, StatusCode::SEE_OTHER);
    assert_eq!(app.post_count().await, 2);
    assert_eq!(
        app.get("/group/cats/", None).await.page_texts(),
        ["with a group"]
    );

    let blank = app
        .submit_urlencoded("/create/", Some(&token), "text=&group=")
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        blank.context()["form"]["errors"]["text"],
        json!([REQUIRED_MESSAGE])
    );
    assert_eq!(app.post_count().await, 2);
}

#[tokio::test]
async fn html_form_edits_are_accepted() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let token = app.login(&author).await;
    let post = app.post(&author, "original", None).await;

    let reply = app
        .submit_urlencoded(
            &format!("/posts/{}/edit/", post.id),
            Some(&token),
            "text=edited",
        )
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);

    let stored = app.stored_post(&post).await;
    assert_eq!(stored.text.get(), "edited");
    assert_eq!(stored.pub_date, post.pub_date);
}

#[tokio::test]
async fn non_string_text_is_shown_as_a_field_error() {
    let app = TestApp::new();
    let user = app.user("leo").await;
    let token = app.login(&user).await;

    let reply = app
        .submit("/create/", Some(&token), &json!({ "text": 123 }))
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        reply.context()["form"]["errors"]["text"],
        json!([REQUIRED_MESSAGE])
    );
    assert_eq!(app.post_count().await, 0);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = TestApp::new();
    let user = app.user("leo").await;
    let token = app.login(&user).await;

    let reply = app
        .submit("/create/", Some(&token), &json!("not a form"))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.post_count().await, 0);
}

#[tokio::test]
async fn edit_form_is_prefilled_for_the_author() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let token = app.login(&author).await;
    let group = app.group("cats").await;
    let post = app.post(&author, "original", Some(&group)).await;

    let reply = app
        .get(&format!("/posts/{}/edit/", post.id), Some(&token))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.view(), "posts/create_post");
    let context = reply.context();
    assert_eq!(context["is_edit"], json!(true));
    assert_eq!(context["post"]["id"], json!(post.id.get()));
    assert_eq!(context["form"]["values"]["text"], json!("original"));
    assert_eq!(context["form"]["values"]["group"], json!(group.id.get()));
}

#[tokio::test]
async fn other_users_cannot_edit() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let intruder = app.user("mallory").await;
    let token = app.login(&intruder).await;
    let post = app.post(&author, "original", None).await;
    let edit_uri = format!("/posts/{}/edit/", post.id);
    let detail_uri = format!("/posts/{}/", post.id);

    let form = app.get(&edit_uri, Some(&token)).await;
    assert_eq!(form.status, StatusCode::SEE_OTHER);
    assert_eq!(form.location.as_deref(), Some(detail_uri.as_str()));

    let submit = app
        .submit(&edit_uri, Some(&token), &json!({ "text": "defaced" }))
        .await;
    assert_eq!(submit.status, StatusCode::SEE_OTHER);
    assert_eq!(submit.location.as_deref(), Some(detail_uri.as_str()));

    // Checked before the body is even looked at.
    let garbage = app
        .submit(&edit_uri, Some(&token), &json!("garbage"))
        .await;
    assert_eq!(garbage.status, StatusCode::SEE_OTHER);

    assert_eq!(app.stored_post(&post).await, post);
}

#[tokio::test]
async fn author_edit_changes_only_text_and_group() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let token = app.login(&author).await;
    let with = app.group("with").await;
    let without = app.group("without").await;
    let post = app.post(&author, "original", Some(&without)).await;
    let edit_uri = format!("/posts/{}/edit/", post.id);
    let form = json!({ "text": "edited", "group": with.id.to_string() });

    for _ in 0..2 {
        let reply = app.submit(&edit_uri, Some(&token), &form).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(
            reply.location,
            Some(format!("/posts/{}/", post.id))
        );

        let stored = app.stored_post(&post).await;
        assert_eq!(stored.text.get(), "edited");
        assert_eq!(stored.group.as_ref().map(|group| group.id), Some(with.id));
        assert_eq!(stored.author, post.author);
        assert_eq!(stored.pub_date, post.pub_date);
    }
    assert_eq!(app.post_count().await, 1);

    assert_eq!(app.get("/group/with/", None).await.page_texts(), ["edited"]);
    assert!(app.get("/group/without/", None).await.page_texts().is_empty());
}

#[tokio::test]
async fn invalid_edit_leaves_the_post_alone() {
    let app = TestApp::new();
    let author = app.user("leo").await;
    let token = app.login(&author).await;
    let post = app.post(&author, "original", None).await;

    let reply = app
        .submit(
            &format!("/posts/{}/edit/", post.id),
            Some(&token),
            &json!({ "text": "" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let context = reply.context();
    assert_eq!(context["is_edit"], json!(true));
    assert_eq!(context["post"]["id"], json!(post.id.get()));
    assert_eq!(context["form"]["errors"]["text"], json!([REQUIRED_MESSAGE]));

    assert_eq!(app.stored_post(&post).await, post);
}

#[tokio::test]
async fn editing_a_missing_post_is_not_found() {
    let app = TestApp::new();
    let user = app.user("leo").await;
    let token = app.login(&user).await;

    let form = app.get("/posts/999/edit/", Some(&token)).await;
    assert_eq!(form.status, StatusCode::NOT_FOUND);

    let submit = app
        .submit("/posts/999/edit/", Some(&token), &json!({ "text": "x" }))
        .await;
    assert_eq!(submit.status, StatusCode::NOT_FOUND);
    assert_eq!(app.post_count().await, 0);
}
