use super::app::TEST_JWT_SECRET;
use api::auth::Claims;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

/// Signs a token the way the identity service would.
pub fn generate_jwt(user_id: i64, admin: bool) -> String {
    let claims = Claims {
        sub: user_id,
        admin,
        exp: (Utc::now() + Duration::minutes(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Token encoding failed")
}
