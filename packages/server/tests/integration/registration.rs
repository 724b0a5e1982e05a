use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use server::entity::registration;

use crate::common::{TestApp, routes};

mod capacity {
    use super::*;

    #[tokio::test]
    async fn places_count_down_and_free_up_on_cancel() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Small Room", 2).await;
        let a = app.create_user("a@test.com").await;
        let b = app.create_user("b@test.com").await;
        let c = app.create_user("c@test.com").await;

        app.register_for_event(event_id, &a.token).await;
        assert_eq!(app.available_places(event_id).await, 1);

        app.register_for_event(event_id, &b.token).await;
        assert_eq!(app.available_places(event_id).await, 0);

        let res = app
            .post_with_token(&routes::event_register(event_id), &json!({}), &c.token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "EVENT_FULL");
        assert_eq!(res.body["message"], "Event is fully booked");

        let res = app
            .delete_with_token(&routes::event_register(event_id), &a.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Registration cancelled");
        assert_eq!(app.available_places(event_id).await, 1);

        app.register_for_event(event_id, &c.token).await;
        assert_eq!(app.available_places(event_id).await, 0);
    }

    #[tokio::test]
    async fn rejected_registration_writes_no_row() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Tiny", 1).await;
        let a = app.create_user("a@test.com").await;
        let b = app.create_user("b@test.com").await;
        app.register_for_event(event_id, &a.token).await;

        let res = app
            .post_with_token(&routes::event_register(event_id), &json!({}), &b.token)
            .await;
        assert_eq!(res.status, 400);

        let rows = registration::Entity::find()
            .filter(registration::Column::EventId.eq(event_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_for_the_last_place_admit_exactly_one() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Last Seat", 1).await;
        let a = app.create_user("a@test.com").await;
        let b = app.create_user("b@test.com").await;
        let path = routes::event_register(event_id);
        let body = json!({});

        let (ra, rb) = futures::join!(
            app.post_with_token(&path, &body, &a.token),
            app.post_with_token(&path, &body, &b.token),
        );

        let mut statuses = [ra.status, rb.status];
        statuses.sort_unstable();
        assert_eq!(statuses, [201, 400], "{} / {}", ra.text, rb.text);
        let loser = if ra.status == 400 { &ra } else { &rb };
        assert_eq!(loser.body["code"], "EVENT_FULL");
        assert_eq!(app.available_places(event_id).await, 0);
    }

    #[tokio::test]
    async fn many_concurrent_registrations_never_overbook() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Rush", 3).await;

        let mut users = Vec::new();
        for i in 0..8 {
            users.push(app.create_user(&format!("rush{i}@test.com")).await);
        }
        let path = routes::event_register(event_id);
        let body = json!({});
        let responses = futures::future::join_all(
            users
                .iter()
                .map(|u| app.post_with_token(&path, &body, &u.token)),
        )
        .await;

        let admitted = responses.iter().filter(|r| r.status == 201).count();
        assert_eq!(admitted, 3);
        assert!(
            responses
                .iter()
                .filter(|r| r.status != 201)
                .all(|r| r.body["code"] == "EVENT_FULL")
        );
        assert_eq!(app.available_places(event_id).await, 0);
    }
}

mod duplicates {
    use super::*;

    #[tokio::test]
    async fn second_registration_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Once", 10).await;
        let user = app.create_user("user@test.com").await;
        app.register_for_event(event_id, &user.token).await;

        let res = app
            .post_with_token(&routes::event_register(event_id), &json!({}), &user.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "ALREADY_REGISTERED");
        assert_eq!(app.available_places(event_id).await, 9);
    }

    #[tokio::test]
    async fn duplicate_is_reported_before_full() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Packed", 1).await;
        let user = app.create_user("user@test.com").await;
        app.register_for_event(event_id, &user.token).await;

        let res = app
            .post_with_token(&routes::event_register(event_id), &json!({}), &user.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "ALREADY_REGISTERED");
    }

    #[tokio::test]
    async fn re_registering_after_cancel_reuses_the_row() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Again", 10).await;
        let user = app.create_user("user@test.com").await;
        let first_id = app.register_for_event(event_id, &user.token).await;

        let res = app
            .delete_with_token(&routes::event_register(event_id), &user.token)
            .await;
        assert_eq!(res.status, 200);

        let second_id = app.register_for_event(event_id, &user.token).await;
        assert_eq!(first_id, second_id);
    }
}

mod cancel {
    use super::*;

    #[tokio::test]
    async fn cancelling_without_a_registration_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Empty", 10).await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .delete_with_token(&routes::event_register(event_id), &user.token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn cancelling_twice_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Twice", 10).await;
        let user = app.create_user("user@test.com").await;
        app.register_for_event(event_id, &user.token).await;

        let first = app
            .delete_with_token(&routes::event_register(event_id), &user.token)
            .await;
        assert_eq!(first.status, 200);

        let second = app
            .delete_with_token(&routes::event_register(event_id), &user.token)
            .await;
        assert_eq!(second.status, 404);
    }

    #[tokio::test]
    async fn registering_for_a_missing_event_is_not_found() {
        let app = TestApp::spawn().await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .post_with_token(&routes::event_register(9999), &json!({}), &user.token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["message"], "Event not found");
    }
}

mod guests {
    use super::*;

    #[tokio::test]
    async fn guest_can_register_without_an_account() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Open Day", 2).await;

        let res = app
            .post_without_token(
                &routes::event_guest_register(event_id),
                &json!({"name": "Jane Guest", "email": "Jane@Example.com", "phone": "+49 30 1234567"}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["type"], "Guest");
        assert!(res.body["user_id"].is_null());
        assert_eq!(res.body["email"], "jane@example.com");
        assert_eq!(res.body["status"], "CONFIRMED");
        assert_eq!(app.available_places(event_id).await, 1);
    }

    #[tokio::test]
    async fn same_guest_email_cannot_register_twice() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Open Day", 5).await;
        let path = routes::event_guest_register(event_id);

        let first = app
            .post_without_token(&path, &json!({"name": "Jane", "email": "jane@example.com"}))
            .await;
        assert_eq!(first.status, 201);

        let second = app
            .post_without_token(&path, &json!({"name": "Janet", "email": "JANE@example.com"}))
            .await;
        assert_eq!(second.status, 400);
        assert_eq!(second.body["code"], "ALREADY_REGISTERED");
    }

    #[tokio::test]
    async fn guests_and_accounts_share_the_capacity() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Shared", 1).await;
        let guest = app
            .post_without_token(
                &routes::event_guest_register(event_id),
                &json!({"name": "Jane", "email": "jane@example.com"}),
            )
            .await;
        assert_eq!(guest.status, 201);

        let user = app.create_user("user@test.com").await;
        let res = app
            .post_with_token(&routes::event_register(event_id), &json!({}), &user.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "EVENT_FULL");
    }

    #[tokio::test]
    async fn invalid_guest_email_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Open Day", 5).await;

        let res = app
            .post_without_token(
                &routes::event_guest_register(event_id),
                &json!({"name": "Jane", "email": "not-an-email"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod status_and_listing {
    use super::*;

    #[tokio::test]
    async fn registration_status_reflects_the_callers_registration() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Status", 5).await;
        let user = app.create_user("user@test.com").await;
        let path = routes::event_registration_status(event_id);

        let res = app.get_with_token(&path, &user.token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["is_registered"], false);
        assert!(res.body["registration"].is_null());

        app.register_for_event(event_id, &user.token).await;
        let res = app.get_with_token(&path, &user.token).await;
        assert_eq!(res.body["is_registered"], true);
        assert_eq!(res.body["registration"]["status"], "CONFIRMED");

        app.delete_with_token(&routes::event_register(event_id), &user.token)
            .await;
        let res = app.get_with_token(&path, &user.token).await;
        assert_eq!(res.body["is_registered"], false);
        assert_eq!(res.body["registration"]["status"], "CANCELLED");
    }

    #[tokio::test]
    async fn admin_sees_accounts_and_guests() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Mixed", 5).await;
        let user = app.create_user("user@test.com").await;
        app.register_for_event(event_id, &user.token).await;
        app.post_without_token(
            &routes::event_guest_register(event_id),
            &json!({"name": "Jane", "email": "jane@example.com"}),
        )
        .await;

        let res = app
            .get_with_token(&routes::event_registrations(event_id), &admin.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "User");
        assert_eq!(items[0]["email"], "user@test.com");
        assert_eq!(items[0]["name"], "Test User");
        assert_eq!(items[1]["type"], "Guest");
        assert_eq!(items[1]["name"], "Jane");
    }

    #[tokio::test]
    async fn regular_user_cannot_list_registrations() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;
        let event_id = app.create_event(&admin.token, "Private", 5).await;
        let user = app.create_user("user@test.com").await;

        let res = app
            .get_with_token(&routes::event_registrations(event_id), &user.token)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn listing_registrations_of_a_missing_event_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin().await;

        let res = app
            .get_with_token(&routes::event_registrations(9999), &admin.token)
            .await;

        assert_eq!(res.status, 404);
    }
}
