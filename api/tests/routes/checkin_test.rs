#[cfg(test)]
mod tests {
    use crate::helpers::{generate_jwt, make_test_app};
    use api::state::AppState;
    use axum::{
        body::Body as AxumBody,
        extract::ConnectInfo,
        http::{Request, StatusCode, header::RETRY_AFTER},
        response::Response,
    };
    use chrono::{Duration, Utc};
    use db::models::event;
    use db::models::user::UserRole;
    use db::test_utils::{seed_event, seed_user};
    use sea_orm::{ActiveModelTrait, Set};
    use serde_json::{Value, json};
    use serial_test::serial;
    use services::SessionResponse;
    use std::net::SocketAddr;
    use tower::ServiceExt;
    use util::config::AppConfig;

    async fn get_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn checkin_request(token: &str, body: Value) -> Request<AxumBody> {
        checkin_request_from(token, body, "10.20.3.4", None)
    }

    fn checkin_request_from(
        token: &str,
        body: Value,
        peer: &str,
        forwarded_for: Option<&str>,
    ) -> Request<AxumBody> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/checkin")
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json");
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("X-Forwarded-For", forwarded_for);
        }
        let mut req = builder.body(AxumBody::from(body.to_string())).unwrap();
        let peer: SocketAddr = format!("{peer}:40000").parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        req
    }

    struct TestData {
        event: event::Model,
        session: SessionResponse,
        attendee_token: String,
    }

    async fn setup_test_data(state: &AppState) -> TestData {
        let db = state.db();
        let owner = seed_user(db, "organizer", UserRole::Organizer).await;
        let attendee = seed_user(db, "attendee", UserRole::Participant).await;
        let event = seed_event(db, owner.id, Utc::now() - Duration::minutes(1)).await;
        let session = state
            .engine()
            .sessions
            .generate(event.id, owner.id, Utc::now())
            .await
            .unwrap();

        TestData {
            event,
            session,
            attendee_token: generate_jwt(attendee.id, false),
        }
    }

    fn scan_body(session: &SessionResponse) -> Value {
        json!({
            "session_id": session.session_id,
            "signature": session.signature,
        })
    }

    #[tokio::test]
    #[serial]
    async fn valid_scan_records_attendance_once() {
        let (app, state) = make_test_app().await;
        let data = setup_test_data(&state).await;

        let response = app
            .clone()
            .oneshot(checkin_request(&data.attendee_token, scan_body(&data.session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = get_json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["event_id"], data.event.id);
        assert_eq!(json["data"]["status"], "present");
        assert_eq!(json["data"]["check_in_method"], "wifi");

        let response = app
            .oneshot(checkin_request(&data.attendee_token, scan_body(&data.session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = get_json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["reason"], "already_used");
    }

    #[tokio::test]
    #[serial]
    async fn forged_signature_is_unprocessable() {
        let (app, state) = make_test_app().await;
        let data = setup_test_data(&state).await;

        let body = json!({
            "session_id": data.session.session_id,
            "signature": "00".repeat(32),
        });
        let response = app.oneshot(checkin_request(&data.attendee_token, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(get_json_body(response).await["data"]["reason"], "bad_signature");
    }

    #[tokio::test]
    #[serial]
    async fn unknown_session_is_not_found() {
        let (app, state) = make_test_app().await;
        let data = setup_test_data(&state).await;

        let body = json!({
            "session_id": "00000000-0000-4000-8000-000000000000",
            "signature": data.session.signature,
        });
        let response = app.oneshot(checkin_request(&data.attendee_token, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(get_json_body(response).await["data"]["reason"], "not_found");
    }

    #[tokio::test]
    #[serial]
    async fn scan_outside_geofence_is_rejected() {
        let (app, state) = make_test_app().await;
        let data = setup_test_data(&state).await;
        let mut ev: event::ActiveModel = data.event.clone().into();
        ev.require_gps = Set(true);
        ev.update(state.db()).await.unwrap();

        let mut body = scan_body(&data.session);
        body["geo"] = json!({ "latitude": 10.0 + 150.0 / 111_194.93, "longitude": 106.0 });
        let response = app
            .clone()
            .oneshot(checkin_request(&data.attendee_token, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(get_json_body(response).await["data"]["reason"], "out_of_range");

        let mut body = scan_body(&data.session);
        body["geo"] = json!({ "latitude": 10.0 + 50.0 / 111_194.93, "longitude": 106.0, "accuracy_meters": 5.0 });
        let response = app.oneshot(checkin_request(&data.attendee_token, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_json_body(response).await["data"]["check_in_method"], "gps");
    }

    async fn restrict_to_venue_network(state: &AppState, ev: &event::Model) {
        let mut am: event::ActiveModel = ev.clone().into();
        am.allowed_network_cidr = Set(Some("192.168.0.0/24".into()));
        am.update(state.db()).await.unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn network_policy_ignores_forwarded_header_from_untrusted_peer() {
        let (app, state) = make_test_app().await;
        let data = setup_test_data(&state).await;
        restrict_to_venue_network(&state, &data.event).await;

        let req = checkin_request_from(
            &data.attendee_token,
            scan_body(&data.session),
            "203.0.113.9",
            Some("192.168.0.77"),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(get_json_body(response).await["data"]["reason"], "out_of_range");

        let req = checkin_request_from(&data.attendee_token, scan_body(&data.session), "192.168.0.77", None);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = get_json_body(response).await;
        assert_eq!(json["data"]["check_in_method"], "wifi");
    }

    #[tokio::test]
    #[serial]
    async fn network_policy_trusts_configured_proxy() {
        let (app, state) = make_test_app().await;
        AppConfig::set_trusted_proxies(vec!["10.0.0.0/8".into()]);
        let data = setup_test_data(&state).await;
        restrict_to_venue_network(&state, &data.event).await;

        let req = checkin_request_from(
            &data.attendee_token,
            scan_body(&data.session),
            "10.1.1.1",
            Some("192.168.0.77, 10.2.2.2"),
        );
        let response = app.oneshot(req).await.unwrap();
        AppConfig::set_trusted_proxies(Vec::new());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_json_body(response).await["data"]["check_in_method"], "wifi");
    }

    #[tokio::test]
    #[serial]
    async fn sixth_scan_in_a_minute_is_rate_limited() {
        let (app, state) = make_test_app().await;
        let data = setup_test_data(&state).await;
        let forged = json!({
            "session_id": data.session.session_id,
            "signature": "11".repeat(32),
        });

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(checkin_request(&data.attendee_token, forged.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let response = app
            .oneshot(checkin_request(&data.attendee_token, scan_body(&data.session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(RETRY_AFTER));
        let json = get_json_body(response).await;
        assert_eq!(json["data"]["reason"], "rate_limited");
        assert!(json["data"]["retry_after_seconds"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    #[serial]
    async fn checkin_requires_a_token() {
        let (app, state) = make_test_app().await;
        let data = setup_test_data(&state).await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/checkin")
            .header("Content-Type", "application/json")
            .body(AxumBody::from(scan_body(&data.session).to_string()))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
