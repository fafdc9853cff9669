// Client for a padding oracle exposed over HTTP (see `crate::server`)
use reqwest::blocking::Client;
use tracing::trace;

use crate::BLOCK_SIZE;

use super::{Candidate, EncryptionOracle, OracleError, PaddingOracle, Verdict};

/// Blocking HTTP client. Must not be used from inside an async runtime.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: Client,
    base_url: String,
}

impl HttpOracle {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl PaddingOracle for HttpOracle {
    fn query(&self, candidate: &Candidate) -> Result<Verdict, OracleError> {
        let response = self
            .client
            .get(format!("{}/decrypt", self.base_url))
            .query(&[
                ("iv", hex::encode(candidate.iv())),
                ("ciphertext", hex::encode(candidate.ciphertext())),
            ])
            .send()?;
        let status = response.status();
        let body = response.bytes()?;
        trace!(%status, "oracle responded");

        let verdict = Verdict::from_output(&body);
        if verdict == Verdict::Invalid || status.is_success() {
            return Ok(verdict);
        }
        Err(OracleError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

impl EncryptionOracle for HttpOracle {
    fn encrypt(&self, plaintext: &[u8]) -> Result<([u8; BLOCK_SIZE], Vec<u8>), OracleError> {
        let response = self
            .client
            .get(format!("{}/encrypt", self.base_url))
            .query(&[("plaintext", hex::encode(plaintext))])
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = hex::decode(body.trim())
            .map_err(|e| OracleError::Malformed(format!("illegal hex: {}", e)))?;
        if bytes.len() < 2 * BLOCK_SIZE || bytes.len() % BLOCK_SIZE != 0 {
            return Err(OracleError::Malformed(format!(
                "expected an IV and whole ciphertext blocks, got {} bytes",
                bytes.len()
            )));
        }
        let candidate = Candidate::from_chained(&bytes);
        Ok((*candidate.iv(), candidate.ciphertext().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::{
        oracle::local::LocalOracle,
        server::{spawn_server, OracleRequestHandler},
        AttackConfig, PaddingOracleAttack,
    };

    fn start_server(oracle: LocalOracle) -> (tokio::runtime::Runtime, String) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handler = OracleRequestHandler::new(oracle);
        let address = runtime
            .block_on(spawn_server("127.0.0.1:0", handler))
            .unwrap();
        (runtime, address)
    }

    #[test]
    fn query_reports_valid_and_invalid_padding() {
        let oracle = LocalOracle::random(128).unwrap();
        let (iv, ciphertext) = oracle.encrypt(b"HELLO WORLD").unwrap();
        let (_runtime, address) = start_server(oracle);
        let client = HttpOracle::new(address);
        let mut forged_iv = iv;
        forged_iv[BLOCK_SIZE - 1] ^= 0xFF;

        let valid = client.query(&Candidate::new(iv, ciphertext.clone())).unwrap();
        let invalid = client.query(&Candidate::new(forged_iv, ciphertext)).unwrap();

        assert_eq!(valid, Verdict::Valid);
        assert_eq!(invalid, Verdict::Invalid);
    }

    #[test]
    fn encrypt_returns_ciphertext_the_oracle_accepts() {
        let oracle = LocalOracle::random(256).unwrap();
        let (_runtime, address) = start_server(oracle.clone());
        let client = HttpOracle::new(format!("{}/", address));

        let (iv, ciphertext) = client.encrypt(b"YELLOW SUBMARINE").unwrap();

        assert_eq!(ciphertext.len(), 2 * BLOCK_SIZE);
        assert_eq!(oracle.decrypt_output(&iv, &ciphertext), Ok(""));
    }

    #[test]
    fn query_fails_for_malformed_candidates() {
        let (_runtime, address) = start_server(LocalOracle::random(128).unwrap());
        let client = HttpOracle::new(address);

        let result = client.query(&Candidate::new([0; BLOCK_SIZE], vec![0; 5]));

        assert!(matches!(
            result,
            Err(OracleError::Status { status: 400, .. })
        ));
    }

    #[test]
    fn query_fails_when_nothing_is_listening() {
        let address = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };
        let client = HttpOracle::new(address);

        let result = client.query(&Candidate::new([0; BLOCK_SIZE], vec![0; BLOCK_SIZE]));

        assert!(matches!(result, Err(OracleError::Transport(_))));
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn attack_recovers_final_block_over_http(#[case] parallel: bool) {
        let (_runtime, address) = start_server(LocalOracle::random(128).unwrap());
        let client = HttpOracle::new(address);

        let recovered = PaddingOracleAttack::new(&client)
            .with_config(AttackConfig::default().parallel(parallel))
            .run_encrypted(&client, b"HELLO WORLD")
            .unwrap();

        assert_eq!(recovered.padding_length(), 5);
        assert_eq!(recovered.content(), b"HELLO WORLD");
    }
}
