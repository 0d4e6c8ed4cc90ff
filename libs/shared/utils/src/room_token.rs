use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a room access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomTokenClaims {
    /// Room name the token admits to.
    pub room: String,
    /// Participant id.
    pub sub: String,
    pub name: Option<String>,
    pub owner: bool,
    pub iat: i64,
    pub exp: i64,
}

pub fn sign_room_token(claims: &RoomTokenClaims, secret: &str) -> Result<String, String> {
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let claims_json = serde_json::to_string(claims)
        .map_err(|e| format!("Failed to serialize claims: {}", e))?;

    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json);
    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

pub fn verify_room_token(token: &str, secret: &str, now_ts: i64) -> Result<RoomTokenClaims, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let signature = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| "Invalid signature encoding".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", parts[0], parts[1]).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Room token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| "Invalid claims encoding".to_string())?;
    let claims: RoomTokenClaims = serde_json::from_slice(&claims_bytes)
        .map_err(|_| "Invalid claims format".to_string())?;

    if claims.exp < now_ts {
        debug!("Room token expired at {} (now: {})", claims.exp, now_ts);
        return Err("Token expired".to_string());
    }

    Ok(claims)
}
