use marquee_e2e_tests::{base_url, extend_url, prepare_env, spawn_server};
use serde_json::{Value, json};
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (args, _config_guard) = prepare_env("test_health").await.unwrap();
    let base_url = base_url(&args);

    spawn_server(args).await.unwrap();

    let client = reqwest::Client::new();

    let url = extend_url(&base_url, "v1/healthcheck");
    let response = client.get(url).send().await.unwrap();
    info! {"Response: {:#?}", response};
    assert!(response.status().is_success());
    assert_eq!(
        "application/json",
        response.headers().get("content-type").unwrap()
    );
    let text = response.text().await.unwrap();
    assert!(text.ends_with("}\n"));
    assert!(text.contains("\n\t\"status\": \"available\""));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        json!({
            "status": "available",
            "system_info": {"environment": "staging", "version": "0.1.0"}
        }),
        body
    );
}

#[tokio::test]
#[traced_test]
async fn test_unknown_route() {
    let (args, _config_guard) = prepare_env("test_unknown_route").await.unwrap();
    let base_url = base_url(&args);
    spawn_server(args).await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(extend_url(&base_url, "v1/books"))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        json!({"error": "the requested resource could not be found"}),
        body
    );
}
