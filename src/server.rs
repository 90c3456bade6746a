//! server.rs
//!
//! HTTP surface of the hub:
//!
//! | Route          | Purpose                                  |
//! |----------------|------------------------------------------|
//! | `POST /data`   | heart-rate push from the wearable        |
//! | `GET /stream`  | fused event stream (`text/event-stream`) |
//! | `GET /latest`  | current bpm + emg as JSON                |
//! | `POST /reset`  | restart the session clock                |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use warp::http::{header, Response, StatusCode};
use warp::hyper::Body;
use warp::{Filter, Rejection, Reply};

use crate::error::HubError;
use crate::hub::Hub;
use crate::types::event::to_spaced_json;
use crate::types::HeartRateBatch;

#[derive(Debug, Serialize)]
struct ResetResponse {
    status: &'static str,
    /// Unix seconds of the new session start.
    time: f64,
}

fn with_hub(hub: Arc<Hub>) -> impl Filter<Extract = (Arc<Hub>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&hub))
}

fn json_reply<T: Serialize>(value: &T) -> Response<Body> {
    let response = match to_spaced_json(value) {
        Ok(body) => Response::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body)),
        Err(e) => {
            log::warn!("Failed to serialize response: {}", e);
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
        }
    };
    response.unwrap_or_else(|_| Response::new(Body::empty()))
}

/// All routes, with CORS.
pub fn routes(hub: Arc<Hub>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    let data = warp::path("data")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_hub(Arc::clone(&hub)))
        .and_then(handle_data);

    let stream = warp::path("stream")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_hub(Arc::clone(&hub)))
        .and_then(handle_stream);

    let latest = warp::path("latest")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_hub(Arc::clone(&hub)))
        .and_then(handle_latest);

    let reset = warp::path("reset")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_hub(hub))
        .and_then(handle_reset);

    // plain OPTIONS without CORS request headers
    let options = warp::options()
        .and(warp::path("data").or(warp::path("reset")).unify())
        .and(warp::path::end())
        .map(|| StatusCode::NO_CONTENT);

    data.or(stream)
        .or(latest)
        .or(reset)
        .or(options)
        .with(cors)
}

async fn handle_data(batch: HeartRateBatch, hub: Arc<Hub>) -> Result<impl Reply, Rejection> {
    log::debug!("[HR] Raw payload: {:?}", batch);
    hub.ingest(&batch);
    Ok("ok")
}

async fn handle_stream(hub: Arc<Hub>) -> Result<impl Reply, Rejection> {
    let frames = hub
        .open_stream()
        .into_stream()
        .map(|frame| Ok::<_, Infallible>(frame.into_string()));

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::wrap_stream(frames))
        .unwrap_or_else(|_| Response::new(Body::empty()));
    Ok(response)
}

async fn handle_latest(hub: Arc<Hub>) -> Result<impl Reply, Rejection> {
    Ok(json_reply(&hub.latest()))
}

async fn handle_reset(hub: Arc<Hub>) -> Result<impl Reply, Rejection> {
    let started = hub.reset();
    let time = started.timestamp_millis() as f64 / 1000.0;
    Ok(json_reply(&ResetResponse {
        status: "reset",
        time,
    }))
}

/// Serve until the process exits.
pub async fn serve(hub: Arc<Hub>) -> Result<(), HubError> {
    let addr: SocketAddr = hub
        .config()
        .bind_addr
        .parse()
        .map_err(|e| HubError::ConfigError(format!("bind_addr: {}", e)))?;
    log::info!("Listening on http://{}", addr);
    warp::serve(routes(hub)).run(addr).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::types::Signal;

    fn hub() -> Arc<Hub> {
        Arc::new(Hub::new(HubConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_post_data_updates_heart_rate() {
        let hub = hub();
        let res = warp::test::request()
            .method("POST")
            .path("/data")
            .body(r#"{"payload": [{"name": "heart rate", "values": {"bpm": 75}}]}"#)
            .reply(&routes(Arc::clone(&hub)))
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "ok");
        assert_eq!(hub.store().get(Signal::HeartRate), 75.0);
    }

    #[tokio::test]
    async fn test_post_data_skips_misshapen_entries() {
        let hub = hub();
        let res = warp::test::request()
            .method("POST")
            .path("/data")
            .body(
                r#"{"payload": [{"name": "battery", "values": 87}, {"name": 3, "values": null}, {"name": "heart rate", "values": {"bpm": 75}}]}"#,
            )
            .reply(&routes(Arc::clone(&hub)))
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "ok");
        assert_eq!(hub.store().get(Signal::HeartRate), 75.0);
    }

    #[tokio::test]
    async fn test_bare_options_is_no_content() {
        for path in ["/data", "/reset"] {
            let res = warp::test::request()
                .method("OPTIONS")
                .path(path)
                .reply(&routes(hub()))
                .await;
            assert_eq!(res.status(), 204, "{}", path);
            assert!(res.body().is_empty());
        }
    }

    #[tokio::test]
    async fn test_latest_returns_rounded_values() {
        let hub = hub();
        hub.store().set(Signal::HeartRate, 72.34);
        hub.store().set(Signal::Emg, 1999.96);

        let res = warp::test::request()
            .path("/latest")
            .reply(&routes(hub))
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "{\"bpm\": 72.3, \"emg\": 2000.0}");
    }

    #[tokio::test]
    async fn test_reset_reports_new_start() {
        let hub = hub();
        let res = warp::test::request()
            .method("POST")
            .path("/reset")
            .reply(&routes(Arc::clone(&hub)))
            .await;

        assert_eq!(res.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["status"], "reset");
        let expected = hub.clock().started_at().timestamp_millis() as f64 / 1000.0;
        assert_eq!(body["time"].as_f64(), Some(expected));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let res = warp::test::request()
            .path("/nope")
            .reply(&routes(hub()))
            .await;
        assert_eq!(res.status(), 404);
    }
}
