use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{auth, booking, event, registration, user};
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/events", event_routes())
        .nest("/bookings", booking_routes())
        .nest("/users", user_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::create_admin))
        .routes(routes!(auth::login))
        .routes(routes!(auth::me))
}

fn event_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(event::list_events, event::create_event))
        .routes(routes!(
            event::get_event,
            event::update_event,
            event::delete_event
        ))
        .routes(routes!(
            registration::register_for_event,
            registration::cancel_event_registration
        ))
        .routes(routes!(registration::guest_register))
        .routes(routes!(registration::registration_status))
        .routes(routes!(registration::list_event_registrations))
}

fn booking_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(booking::create_booking))
        .routes(routes!(booking::user_bookings))
        .routes(routes!(booking::event_bookings))
        .routes(routes!(booking::update_booking))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(user::list_users))
        .routes(routes!(user::my_events))
        .routes(routes!(user::get_user))
}
