#[cfg(test)]
mod tests {
    use crate::helpers::{generate_jwt, make_test_app};
    use axum::{
        body::Body as AxumBody,
        http::{Request, StatusCode},
        response::Response,
    };
    use chrono::{Duration, Utc};
    use db::models::{event, user::UserRole};
    use db::test_utils::{seed_event, seed_user};
    use serde_json::Value;
    use serial_test::serial;
    use tower::ServiceExt;

    async fn get_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn request(method: &str, uri: String, token: Option<&str>) -> Request<AxumBody> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(AxumBody::empty()).unwrap()
    }

    async fn seed(db: &sea_orm::DatabaseConnection) -> (i64, event::Model) {
        let owner = seed_user(db, "organizer", UserRole::Organizer).await;
        let ev = seed_event(db, owner.id, Utc::now() - Duration::minutes(1)).await;
        (owner.id, ev)
    }

    #[tokio::test]
    #[serial]
    async fn owner_can_create_a_signed_session() {
        let (app, state) = make_test_app().await;
        let (owner_id, ev) = seed(state.db()).await;
        let token = generate_jwt(owner_id, false);

        let uri = format!("/api/events/{}/qr/sessions", ev.id);
        let response = app.oneshot(request("POST", uri, Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = get_json_body(response).await;
        assert_eq!(json["success"], true);
        let data = &json["data"];
        assert_eq!(data["event_id"], ev.id);
        assert_eq!(data["refresh_interval_seconds"], 30);

        let payload = data["qr_payload"].as_str().unwrap();
        let signature = data["signature"].as_str().unwrap();
        assert!(payload.contains(data["session_id"].as_str().unwrap()));
        assert!(state.signer().verify(payload, signature));
    }

    #[tokio::test]
    #[serial]
    async fn create_requires_a_token() {
        let (app, state) = make_test_app().await;
        let (_, ev) = seed(state.db()).await;

        let uri = format!("/api/events/{}/qr/sessions", ev.id);
        let response = app.oneshot(request("POST", uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn stranger_is_forbidden_and_manager_is_not() {
        let (app, state) = make_test_app().await;
        let (_, ev) = seed(state.db()).await;
        let stranger = seed_user(state.db(), "stranger", UserRole::Participant).await;
        let manager = seed_user(state.db(), "manager", UserRole::Manager).await;
        let uri = format!("/api/events/{}/qr/sessions", ev.id);

        let token = generate_jwt(stranger.id, false);
        let response = app
            .clone()
            .oneshot(request("POST", uri.clone(), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = get_json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["code"], "forbidden");

        let token = generate_jwt(manager.id, false);
        let response = app.oneshot(request("POST", uri, Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    #[serial]
    async fn unknown_event_is_not_found() {
        let (app, state) = make_test_app().await;
        let (owner_id, _) = seed(state.db()).await;
        let token = generate_jwt(owner_id, false);

        let response = app
            .oneshot(request("POST", "/api/events/424242/qr/sessions".into(), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = get_json_body(response).await;
        assert_eq!(json["data"]["code"], "not_found");
    }

    #[tokio::test]
    #[serial]
    async fn active_session_follows_refresh() {
        let (app, state) = make_test_app().await;
        let (owner_id, ev) = seed(state.db()).await;
        let token = generate_jwt(owner_id, false);
        let active_uri = format!("/api/events/{}/qr/sessions/active", ev.id);

        let response = app
            .clone()
            .oneshot(request("GET", active_uri.clone(), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(get_json_body(response).await["data"]["code"], "no_active_session");

        let created = get_json_body(
            app.clone()
                .oneshot(request("POST", format!("/api/events/{}/qr/sessions", ev.id), Some(&token)))
                .await
                .unwrap(),
        )
        .await;

        let response = app
            .clone()
            .oneshot(request("POST", format!("/api/events/{}/qr/sessions/refresh", ev.id), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let refreshed = get_json_body(response).await;
        assert_ne!(refreshed["data"]["session_id"], created["data"]["session_id"]);

        let response = app
            .oneshot(request("GET", active_uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let active = get_json_body(response).await;
        assert_eq!(active["data"]["session_id"], refreshed["data"]["session_id"]);
    }

    #[tokio::test]
    #[serial]
    async fn participant_cannot_read_the_active_session() {
        let (app, state) = make_test_app().await;
        let (owner_id, ev) = seed(state.db()).await;
        let participant = seed_user(state.db(), "participant", UserRole::Participant).await;
        let manager = seed_user(state.db(), "manager", UserRole::Manager).await;

        let owner_token = generate_jwt(owner_id, false);
        let response = app
            .clone()
            .oneshot(request("POST", format!("/api/events/{}/qr/sessions", ev.id), Some(&owner_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let active_uri = format!("/api/events/{}/qr/sessions/active", ev.id);
        let response = app
            .clone()
            .oneshot(request("GET", active_uri.clone(), Some(&generate_jwt(participant.id, false))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = get_json_body(response).await;
        assert_eq!(json["data"]["code"], "forbidden");
        assert!(json["data"].get("signature").is_none());

        let response = app
            .oneshot(request("GET", active_uri, Some(&generate_jwt(manager.id, false))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
