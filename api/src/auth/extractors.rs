use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use axum_extra::extract::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use ipnet::IpNet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use util::config;

use crate::auth::claims::{AuthUser, Claims};

/// Extracts `AuthUser` from an `Authorization: Bearer <jwt>` header.
///
/// # Errors
/// `401 Unauthorized` if the header is missing or malformed, or if the token
/// fails HS256 verification or has expired.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| (StatusCode::UNAUTHORIZED, "Missing or invalid Authorization header"))?;

        let secret = config::jwt_secret();
        if secret.is_empty() {
            tracing::error!("JWT_SECRET is not configured; rejecting bearer token");
            return Err((StatusCode::UNAUTHORIZED, "Invalid or expired token"));
        }

        let token_data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthUser(token_data.claims))
    }
}

/// Client address used for network policies.
///
/// The peer address is authoritative. `X-Forwarded-For` is only consulted when
/// the peer is one of `TRUSTED_PROXIES`; the hops are then walked right to left
/// and the first address that is not itself a trusted proxy is the client.
/// `None` when no peer address is known.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(peer) = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
        else {
            return Ok(ClientIp(None));
        };

        let proxies = trusted_proxies();
        if !is_trusted(&proxies, peer) {
            return Ok(ClientIp(Some(peer)));
        }

        let forwarded = parts
            .headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .collect::<Vec<_>>();

        let mut client = peer;
        for hop in forwarded.into_iter().rev() {
            let Ok(ip) = hop.parse::<IpAddr>() else {
                break;
            };
            client = ip;
            if !is_trusted(&proxies, ip) {
                break;
            }
        }

        Ok(ClientIp(Some(client)))
    }
}

fn trusted_proxies() -> Vec<IpNet> {
    config::trusted_proxies()
        .iter()
        .filter_map(|cidr| match cidr.parse::<IpNet>() {
            Ok(net) => Some(net),
            Err(_) => cidr
                .parse::<IpAddr>()
                .map(IpNet::from)
                .map_err(|_| tracing::warn!(cidr = %cidr, "Ignoring unparsable TRUSTED_PROXIES entry"))
                .ok(),
        })
        .collect()
}

fn is_trusted(proxies: &[IpNet], ip: IpAddr) -> bool {
    proxies.iter().any(|net| net.contains(&ip))
}
