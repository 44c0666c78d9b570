use {
    super::*,
    axum::{
        Json, Router,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        response::{IntoResponse, Response},
        routing::post,
    },
    tokio::net::TcpListener,
};

/// `user:pass`
const CREDENTIALS: &str = "Basic dXNlcjpwYXNz";

async fn handle(headers: HeaderMap, Json(request): Json<Value>) -> Response {
    if headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) != Some(CREDENTIALS) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let id = &request["id"];

    match request["method"].as_str() {
        Some("getinfo") => Json(json!({
            "result": {"version": 130_000, "blocks": 1_024, "testnet": true},
            "error": null,
            "id": id,
        }))
        .into_response(),
        Some("getmininginfo") => format!(
            r#"{{"result":{{"difficulty":-nan,"networkhashps":0,"blocks":1}},"error":null,"id":{id}}}"#
        )
        .into_response(),
        Some("echo") => Json(json!({"result": request["params"], "error": null, "id": id}))
            .into_response(),
        Some("submitblock") => Json(json!({
            "result": null,
            "error": {"code": -22, "message": "Block decode failed"},
            "id": id,
        }))
        .into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

async fn fake_daemon() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, Router::new().route("/", post(handle)))
            .await
            .unwrap();
    });

    port
}

async fn client(password: &str) -> RpcClient {
    RpcClient::new("127.0.0.1", fake_daemon().await, "user", password).unwrap()
}

#[tokio::test]
#[timeout(30000)]
async fn typed_getinfo() {
    let info = client("pass").await.getinfo().await.unwrap();

    assert_eq!(info.blocks, 1_024);
    assert!(info.testnet);
}

#[tokio::test]
#[timeout(30000)]
async fn params_are_sent() {
    pretty_assert_eq!(
        client("pass")
            .await
            .call("echo", json!(["a", 1, true]))
            .await
            .unwrap(),
        json!(["a", 1, true]),
    );
}

#[tokio::test]
#[timeout(30000)]
async fn wrong_password() {
    assert!(matches!(
        client("wrong").await.getinfo().await,
        Err(DaemonError::Unauthorized)
    ));
}

#[tokio::test]
#[timeout(30000)]
async fn nan_difficulty_is_repaired() {
    pretty_assert_eq!(
        client("pass")
            .await
            .call("getmininginfo", json!([]))
            .await
            .unwrap(),
        json!({"difficulty": 0, "networkhashps": 0, "blocks": 1}),
    );
}

#[tokio::test]
#[timeout(30000)]
async fn rpc_error_object() {
    match client("pass").await.submitblock("00").await {
        Err(DaemonError::Rpc { code, message }) => {
            assert_eq!(code, -22);
            assert_eq!(message, "Block decode failed");
        }
        other => panic!("unexpected submitblock result: {other:?}"),
    }
}

#[tokio::test]
#[timeout(30000)]
async fn http_failure() {
    match client("pass").await.call("getpeerinfo", json!([])).await {
        Err(DaemonError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
#[timeout(30000)]
async fn unreachable_daemon() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = RpcClient::new("127.0.0.1", port, "user", "pass").unwrap();

    assert_eq!(client.url(), format!("http://127.0.0.1:{port}/"));

    assert!(matches!(
        client.getinfo().await,
        Err(DaemonError::Transport { .. })
    ));
}
