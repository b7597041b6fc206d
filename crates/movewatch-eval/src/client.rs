// Cloud evaluation client.
//
// Issues one GET per position against the `cloud-eval` endpoint, requesting
// three principal variations, and reads the centipawn score of the first.
// Every failure collapses to "no score"; the reason is only logged.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use movewatch_core::capability::Evaluator;
use movewatch_core::config::Config;
use movewatch_core::types::{Position, Score};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const CLOUD_EVAL_PATH: &str = "/api/cloud-eval";

/// Number of principal variations requested per position.
const MULTI_PV: &str = "3";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a position could not be scored. Kept internal to the client.
#[derive(Debug, Error)]
pub(crate) enum EvalError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("evaluator returned status {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("response has no principal variation score")]
    MissingScore,
}

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

/// Subset of the cloud-eval response we read. Other fields (`fen`, `knodes`,
/// `depth`, `moves`) are ignored.
#[derive(Debug, Deserialize)]
struct CloudEvalResponse {
    #[serde(default)]
    pvs: Vec<PrincipalVariation>,
}

#[derive(Debug, Deserialize)]
struct PrincipalVariation {
    cp: Option<i32>,
    mate: Option<i32>,
}

/// Extract the score of the first principal variation from a response body.
///
/// Expected shape: `{ "pvs": [ { "moves": "...", "cp": 30 }, ... ] }`.
/// A mate line (`"mate": N` instead of `cp`) saturates to `±Score::MATE`.
pub(crate) fn parse_score(body: &str) -> Result<Score, EvalError> {
    let response: CloudEvalResponse = serde_json::from_str(body)?;
    let first = response.pvs.first().ok_or(EvalError::MissingScore)?;
    match (first.cp, first.mate) {
        (Some(cp), _) => Ok(Score(cp)),
        (None, Some(mate)) => Score::from_mate(mate).ok_or(EvalError::MissingScore),
        (None, None) => Err(EvalError::MissingScore),
    }
}

// ---------------------------------------------------------------------------
// CloudEvaluator
// ---------------------------------------------------------------------------

pub struct CloudEvaluator {
    http: reqwest::Client,
    endpoint: String,
}

impl CloudEvaluator {
    /// Create a client for the evaluator at `base_url` (scheme and host).
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}{CLOUD_EVAL_PATH}", base_url.trim_end_matches('/')),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.evaluator.base_url)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, position: &Position) -> Result<Score, EvalError> {
        debug!(fen = %position, "requesting cloud evaluation");

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("fen", position.as_str()), ("multiPv", MULTI_PV)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EvalError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        parse_score(&body)
    }
}

#[async_trait]
impl Evaluator for CloudEvaluator {
    async fn evaluate(&self, position: &Position) -> Option<Score> {
        match self.fetch(position).await {
            Ok(score) => {
                debug!(fen = %position, cp = score.centipawns(), "cloud evaluation");
                Some(score)
            }
            Err(e) => {
                warn!(fen = %position, "evaluation unavailable: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    const FEN: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    // -- Body parsing --

    #[test]
    fn parse_first_pv_cp() {
        let body = r#"{
            "fen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            "knodes": 13683,
            "depth": 22,
            "pvs": [
                { "moves": "c7c5 g1f3 d7d6", "cp": 30 },
                { "moves": "e7e5 g1f3 b8c6", "cp": 36 },
                { "moves": "e7e6 d2d4 d7d5", "cp": 41 }
            ]
        }"#;
        assert_eq!(parse_score(body).unwrap(), Score(30));
    }

    #[test]
    fn parse_negative_cp() {
        let body = r#"{ "pvs": [ { "moves": "a7a6", "cp": -412 } ] }"#;
        assert_eq!(parse_score(body).unwrap(), Score(-412));
    }

    #[test]
    fn parse_mate_saturates() {
        let white_mates = r#"{ "pvs": [ { "moves": "d8h4", "mate": 2 } ] }"#;
        let black_mates = r#"{ "pvs": [ { "moves": "d8h4", "mate": -1 } ] }"#;
        assert_eq!(parse_score(white_mates).unwrap(), Score(Score::MATE));
        assert_eq!(parse_score(black_mates).unwrap(), Score(-Score::MATE));
    }

    #[test]
    fn parse_empty_object_is_missing() {
        assert!(matches!(parse_score("{}"), Err(EvalError::MissingScore)));
    }

    #[test]
    fn parse_empty_pvs_is_missing() {
        assert!(matches!(
            parse_score(r#"{ "pvs": [] }"#),
            Err(EvalError::MissingScore)
        ));
    }

    #[test]
    fn parse_pv_without_score_is_missing() {
        assert!(matches!(
            parse_score(r#"{ "pvs": [ { "moves": "e7e5" } ] }"#),
            Err(EvalError::MissingScore)
        ));
    }

    #[test]
    fn parse_invalid_json() {
        assert!(matches!(parse_score("not json"), Err(EvalError::Body(_))));
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            CloudEvaluator::new("https://lichess.org/").endpoint(),
            "https://lichess.org/api/cloud-eval"
        );
        assert_eq!(
            CloudEvaluator::new("http://127.0.0.1:8080").endpoint(),
            "http://127.0.0.1:8080/api/cloud-eval"
        );
    }

    // -- Mock HTTP server --

    /// Serve one canned HTTP response and hand back the raw request head.
    async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (head_tx, head_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let _ = head_tx.send(String::from_utf8_lossy(&buf[..n]).to_string());

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        });

        (format!("http://{addr}"), head_rx)
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn position() -> Position {
        Position::parse(FEN).unwrap()
    }

    #[tokio::test]
    async fn evaluate_returns_first_pv_score() {
        let body = r#"{"fen":"x","depth":20,"pvs":[{"moves":"c7c5","cp":30},{"moves":"e7e5","cp":36}]}"#;
        let (base, head_rx) = serve_once(http_response("200 OK", body)).await;

        let evaluator = CloudEvaluator::new(&base);
        assert_eq!(evaluator.evaluate(&position()).await, Some(Score(30)));

        let head = head_rx.await.unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.starts_with("GET /api/cloud-eval?"), "{request_line}");
        assert!(request_line.contains("multiPv=3"), "{request_line}");
        assert!(request_line.contains("fen=rnbqkbnr%2Fpppppppp"), "{request_line}");
    }

    #[tokio::test]
    async fn evaluate_not_found_is_unavailable() {
        let (base, _head) =
            serve_once(http_response("404 Not Found", r#"{"error":"Not found"}"#)).await;
        let evaluator = CloudEvaluator::new(&base);
        assert_eq!(evaluator.evaluate(&position()).await, None);
    }

    #[tokio::test]
    async fn evaluate_missing_field_is_unavailable() {
        let (base, _head) = serve_once(http_response("200 OK", "{}")).await;
        let evaluator = CloudEvaluator::new(&base);
        assert_eq!(evaluator.evaluate(&position()).await, None);
    }

    #[tokio::test]
    async fn evaluate_garbage_body_is_unavailable() {
        let (base, _head) = serve_once(http_response("200 OK", "<html>busy</html>")).await;
        let evaluator = CloudEvaluator::new(&base);
        assert_eq!(evaluator.evaluate(&position()).await, None);
    }

    #[tokio::test]
    async fn evaluate_connection_refused_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let evaluator = CloudEvaluator::new(&format!("http://{addr}"));
        assert_eq!(evaluator.evaluate(&position()).await, None);
    }
}
