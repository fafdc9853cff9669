// HTTP front end for a padding oracle service
use crate::{
    oracle::{local::LocalOracle, EncryptionOracle},
    BLOCK_SIZE,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, info};

use std::{collections::HashMap, sync::Arc};

/// Bind the oracle service and serve it in the background. Returns the base URL.
pub async fn spawn_server(
    address: impl ToSocketAddrs,
    request_handler: OracleRequestHandler,
) -> std::io::Result<String> {
    let listener = TcpListener::bind(address).await?;
    let addr = listener.local_addr()?;
    let app = router(request_handler);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("padding oracle server stopped: {}", e);
        }
    });
    info!("padding oracle listening on {}", addr);
    Ok(format!("http://{}", addr))
}

pub fn router(request_handler: OracleRequestHandler) -> Router {
    Router::new()
        .route("/decrypt", get(decrypt))
        .route("/encrypt", get(encrypt))
        .with_state(Arc::new(request_handler))
}

async fn decrypt(
    State(handler): State<Arc<OracleRequestHandler>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handler.handle_decrypt(&params)
}

async fn encrypt(
    State(handler): State<Arc<OracleRequestHandler>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handler.handle_encrypt(&params)
}

#[derive(Debug, Clone)]
pub struct OracleRequestHandler {
    oracle: LocalOracle,
}

impl OracleRequestHandler {
    pub fn new(oracle: LocalOracle) -> Self {
        Self { oracle }
    }

    pub fn handle_decrypt(&self, params: &HashMap<String, String>) -> Response {
        let iv = match hex_param(params, "iv") {
            Ok(iv) => iv,
            Err(response) => return response,
        };
        let iv: [u8; BLOCK_SIZE] = match iv.try_into() {
            Ok(iv) => iv,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("IV must be {} bytes", BLOCK_SIZE),
                )
                    .into_response()
            }
        };
        let ciphertext = match hex_param(params, "ciphertext") {
            Ok(ciphertext) => ciphertext,
            Err(response) => return response,
        };

        match self.oracle.decrypt_output(&iv, &ciphertext) {
            Ok("") => (StatusCode::OK, "Padding is valid").into_response(),
            Ok(diagnostic) => {
                debug!("rejected candidate padding");
                (StatusCode::INTERNAL_SERVER_ERROR, diagnostic).into_response()
            }
            Err(e) => (StatusCode::BAD_REQUEST, format!("Illegal ciphertext: {}", e))
                .into_response(),
        }
    }

    pub fn handle_encrypt(&self, params: &HashMap<String, String>) -> Response {
        let plaintext = match hex_param(params, "plaintext") {
            Ok(plaintext) => plaintext,
            Err(response) => return response,
        };

        match self.oracle.encrypt(&plaintext) {
            Ok((iv, ciphertext)) => (
                StatusCode::OK,
                format!("{}{}", hex::encode(iv), hex::encode(ciphertext)),
            )
                .into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

fn hex_param(params: &HashMap<String, String>, name: &str) -> Result<Vec<u8>, Response> {
    let value = params.get(name).ok_or_else(|| {
        (StatusCode::BAD_REQUEST, format!("Missing '{}' parameter", name)).into_response()
    })?;
    hex::decode(value).map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Illegal {}: {}", name, e)).into_response()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::oracle::UNPADDING_DIAGNOSTIC;

    fn params(pairs: &[(&str, String)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn decrypt_prints_diagnostic_for_bad_padding() {
        let oracle = LocalOracle::random(128).unwrap();
        let (mut iv, ciphertext) = oracle.encrypt(b"HELLO WORLD").unwrap();
        iv[BLOCK_SIZE - 1] ^= 0xFF;
        let handler = OracleRequestHandler::new(oracle);

        let response = handler.handle_decrypt(&params(&[
            ("iv", hex::encode(iv)),
            ("ciphertext", hex::encode(ciphertext)),
        ]));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, UNPADDING_DIAGNOSTIC);
    }

    #[tokio::test]
    async fn decrypt_accepts_good_padding() {
        let oracle = LocalOracle::random(192).unwrap();
        let (iv, ciphertext) = oracle.encrypt(b"HELLO WORLD").unwrap();
        let handler = OracleRequestHandler::new(oracle);

        let response = handler.handle_decrypt(&params(&[
            ("iv", hex::encode(iv)),
            ("ciphertext", hex::encode(ciphertext)),
        ]));

        assert_eq!(response.status(), StatusCode::OK);
        assert_ne!(body_text(response).await, UNPADDING_DIAGNOSTIC);
    }

    #[rstest]
    #[case(&[("ciphertext", "00".repeat(16))])]
    #[case(&[("iv", "00".repeat(16))])]
    #[case(&[("iv", "00".repeat(15)), ("ciphertext", "00".repeat(16))])]
    #[case(&[("iv", "zz".repeat(16)), ("ciphertext", "00".repeat(16))])]
    #[case(&[("iv", "00".repeat(16)), ("ciphertext", "00".repeat(17))])]
    fn decrypt_rejects_bad_requests(#[case] pairs: &[(&str, String)]) {
        let handler = OracleRequestHandler::new(LocalOracle::random(128).unwrap());

        let response = handler.handle_decrypt(&params(pairs));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn encrypt_returns_iv_and_ciphertext() {
        let oracle = LocalOracle::random(128).unwrap();
        let handler = OracleRequestHandler::new(oracle.clone());

        let response = handler.handle_encrypt(&params(&[("plaintext", hex::encode("HELLO"))]));

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hex::decode(body_text(response).await).unwrap();
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
        let iv: [u8; BLOCK_SIZE] = bytes[..BLOCK_SIZE].try_into().unwrap();
        assert_eq!(oracle.decrypt_output(&iv, &bytes[BLOCK_SIZE..]), Ok(""));
    }
}
