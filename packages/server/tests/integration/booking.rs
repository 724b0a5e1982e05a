use serde_json::json;

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn user_can_book_an_event() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Concert", 2).await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .post_with_token(routes::BOOKINGS, &json!({"event_id": event_id}), &user.token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["event_id"], event_id);
        assert_eq!(res.body["user_id"], user.id);
        assert_eq!(res.body["type"], "User");
        assert_eq!(res.body["status"], "CONFIRMED");
        assert_eq!(res.body["event"]["title"], "Concert");
        assert_eq!(app.available_places(event_id).await, 1);
    }

    #[tokio::test]
    async fn booking_and_event_registration_are_the_same_place() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Concert", 5).await;
        let user = app.create_user("user@test.com").await;
        app.register_for_event(event_id, &user.token).await;

        let res = app
            .post_with_token(routes::BOOKINGS, &json!({"event_id": event_id}), &user.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "ALREADY_REGISTERED");
    }

    #[tokio::test]
    async fn booking_a_missing_event_is_not_found() {
        let app = TestApp::spawn().await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .post_with_token(routes::BOOKINGS, &json!({"event_id": 9999}), &user.token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn booking_requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::BOOKINGS, &json!({"event_id": 1}))
            .await;

        assert_eq!(res.status, 401);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn user_sees_only_own_bookings_newest_first() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let first = app.create_event(&admin.token, "First", 5).await;
        let second = app.create_event(&admin.token, "Second", 5).await;
        let user = app.create_user("user@test.com").await;
        let other = app.create_user("other@test.com").await;
        app.register_for_event(first, &user.token).await;
        app.register_for_event(second, &user.token).await;
        app.register_for_event(first, &other.token).await;

        let res = app.get_with_token(routes::USER_BOOKINGS, &user.token).await;

        assert_eq!(res.status, 200);
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["event"]["title"], "Second");
        assert_eq!(items[1]["event"]["title"], "First");
        assert!(items.iter().all(|b| b["user_id"] == user.id));
    }

    #[tokio::test]
    async fn admin_can_list_an_events_bookings() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Gala", 5).await;
        let user = app.create_user("user@test.com").await;
        app.register_for_event(event_id, &user.token).await;

        let res = app
            .get_with_token(&routes::event_bookings(event_id), &admin.token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn event_bookings_of_an_unknown_event_are_empty() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;

        let res = app
            .get_with_token(&routes::event_bookings(9999), &admin.token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!([]));
    }

    #[tokio::test]
    async fn regular_user_cannot_list_an_events_bookings() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Gala", 5).await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .get_with_token(&routes::event_bookings(event_id), &user.token)
            .await;

        assert_eq!(res.status, 403);
    }
}

mod update_status {
    use super::*;

    #[tokio::test]
    async fn owner_can_cancel_a_booking() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Gig", 1).await;
        let user = app.create_user("user@test.com").await;
        let booking_id = app.register_for_event(event_id, &user.token).await;

        let res = app
            .put_with_token(
                &routes::booking(booking_id),
                &json!({"status": "CANCELLED"}),
                &user.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "CANCELLED");
        assert_eq!(app.available_places(event_id).await, 1);
    }

    #[tokio::test]
    async fn pending_still_occupies_a_place() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Gig", 1).await;
        let user = app.create_user("user@test.com").await;
        let booking_id = app.register_for_event(event_id, &user.token).await;

        let res = app
            .put_with_token(
                &routes::booking(booking_id),
                &json!({"status": "PENDING"}),
                &admin.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "PENDING");
        assert_eq!(app.available_places(event_id).await, 0);
    }

    #[tokio::test]
    async fn reactivating_needs_a_free_place() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Gig", 1).await;
        let a = app.create_user("a@test.com").await;
        let b = app.create_user("b@test.com").await;
        let booking_id = app.register_for_event(event_id, &a.token).await;

        let res = app
            .put_with_token(
                &routes::booking(booking_id),
                &json!({"status": "CANCELLED"}),
                &a.token,
            )
            .await;
        assert_eq!(res.status, 200);
        app.register_for_event(event_id, &b.token).await;

        let res = app
            .put_with_token(
                &routes::booking(booking_id),
                &json!({"status": "CONFIRMED"}),
                &a.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "EVENT_FULL");
    }

    #[tokio::test]
    async fn invalid_status_is_rejected_before_lookup() {
        let app = TestApp::spawn().await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .put_with_token(&routes::booking(9999), &json!({"status": "DONE"}), &user.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_booking_is_not_found() {
        let app = TestApp::spawn().await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .put_with_token(
                &routes::booking(9999),
                &json!({"status": "CANCELLED"}),
                &user.token,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn other_users_cannot_change_a_booking() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Gig", 5).await;
        let owner = app.create_user("owner@test.com").await;
        let intruder = app.create_user("intruder@test.com").await;
        let booking_id = app.register_for_event(event_id, &owner.token).await;

        let res = app
            .put_with_token(
                &routes::booking(booking_id),
                &json!({"status": "CANCELLED"}),
                &intruder.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["message"], "Not authorized to update this registration");
    }
}
