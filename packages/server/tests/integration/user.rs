use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn admin_can_list_users() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    app.create_user("user@test.com").await;

    let res = app.get_with_token(routes::USERS, &admin.token).await;

    assert_eq!(res.status, 200);
    let users = res.body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u["password"].is_null()));
}

#[tokio::test]
async fn regular_user_cannot_list_users() {
    let app = TestApp::spawn().await;
    let user = app.create_user("user@test.com").await;

    let res = app.get_with_token(routes::USERS, &user.token).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn admin_sees_a_users_registrations() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    let event_id = app.create_event(&admin.token, "Workshop", 5).await;
    let user = app.create_user("user@test.com").await;
    app.register_for_event(event_id, &user.token).await;

    let res = app.get_with_token(&routes::user(user.id), &admin.token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["email"], "user@test.com");
    assert_eq!(res.body["events"], json!([]));
    assert_eq!(res.body["registrations"][0]["event"]["title"], "Workshop");

    let res = app.get_with_token(&routes::user(admin.id), &admin.token).await;
    assert_eq!(res.body["events"][0]["title"], "Workshop");
}

#[tokio::test]
async fn regular_user_cannot_view_a_user() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    let user = app.create_user("user@test.com").await;

    for id in [admin.id, user.id] {
        let res = app.get_with_token(&routes::user(id), &user.token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;

    let res = app.get_with_token(&routes::user(9999), &admin.token).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn my_events_lists_only_active_registrations() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin().await;
    let kept = app.create_event(&admin.token, "Kept", 5).await;
    let dropped = app.create_event(&admin.token, "Dropped", 5).await;
    let user = app.create_user("user@test.com").await;
    app.register_for_event(kept, &user.token).await;
    app.register_for_event(dropped, &user.token).await;
    let res = app
        .delete_with_token(&routes::event_register(dropped), &user.token)
        .await;
    assert_eq!(res.status, 200);

    let res = app.get_with_token(routes::MY_EVENTS, &user.token).await;

    assert_eq!(res.status, 200);
    let events = res.body.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["id"], kept);
    assert_eq!(events[0]["available_places"], 4);
}
