#[cfg(test)]
mod tests {
    use crate::helpers::{generate_jwt, make_test_app};
    use axum::{
        body::Body as AxumBody,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use serial_test::serial;
    use tower::ServiceExt;

    fn post(uri: &str, token: &str) -> Request<AxumBody> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(AxumBody::empty())
            .unwrap()
    }

    async fn get_json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn cleanup_is_admin_only() {
        let (app, _state) = make_test_app().await;

        let response = app
            .clone()
            .oneshot(post("/api/qr/cleanup", &generate_jwt(1, false)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(post("/api/qr/cleanup", &generate_jwt(1, true)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_json_body(response).await["data"]["deleted"], 0);
    }

    #[tokio::test]
    #[serial]
    async fn rotating_keys_activates_the_next_version() {
        let (app, state) = make_test_app().await;
        assert_eq!(state.signer().active_version(), 1);

        let response = app
            .oneshot(post("/api/qr/keys/rotate", &generate_jwt(1, true)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_json_body(response).await["data"]["active_version"], 2);
        assert_eq!(state.signer().active_version(), 2);
    }
}
