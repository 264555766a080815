use std::fs;
use std::time::Duration;

use actix_web::{App, test, web};
use pgm3d_mesher::app_state::AppState;
use pgm3d_mesher::config::ServerConfig;
use pgm3d_mesher::routes;
use serde_json::Value;

const SLAB_VOLUME: &str = "PGM3D\n3 2 2\n255\n0 0 0 0\n100 100 100 100\n250 250 250 250\n";

fn server_config(root: &std::path::Path) -> ServerConfig {
    let resource_dir = root.join("resource");
    fs::create_dir_all(&resource_dir).unwrap();
    fs::write(resource_dir.join("slab.pgm3d"), SLAB_VOLUME).unwrap();
    fs::write(resource_dir.join("broken.pgm3d"), "PGM3D\n3 x 2\n255\n").unwrap();

    ServerConfig {
        resource_dir,
        output_dir: root.join("out"),
        ..ServerConfig::default()
    }
}

#[actix_web::test]
async fn extract_then_poll_then_download() {
    let dir = tempfile::tempdir().unwrap();
    let config = server_config(dir.path());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(&config)))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/mesh/extract")
        .set_json(serde_json::json!({ "file": "slab.pgm3d", "labels": 2 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["shape"], serde_json::json!([3, 2, 2]));
    assert_eq!(body["max_intensity"], 255);
    let task_id = body["task_id"].as_str().unwrap().to_string();

    // 等待后台抽取完成
    let mut state = Value::Null;
    for _ in 0..100 {
        let req = test::TestRequest::get()
            .uri(&format!("/mesh/task?task_id={task_id}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        state = body["state"].clone();
        if state["status"] != "pending" {
            break;
        }
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state["status"], "done", "state = {state}");
    assert_eq!(state["report"]["outputs"][0]["faces"], 8);
    assert!(dir.path().join("out").join(&task_id).join("slab.pgm3d.obj").exists());

    let req = test::TestRequest::get()
        .uri(&format!("/mesh/buffer?task_id={task_id}&label=85"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(resp.headers().get("X-Face-Count").unwrap().to_str().unwrap(), "8");
    assert_eq!(resp.headers().get("X-Vertex-Count").unwrap().to_str().unwrap(), "9");
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.len(), 9 * 12 + 8 * 12);

    // 每个标签只能取一次
    let req = test::TestRequest::get()
        .uri(&format!("/mesh/buffer?task_id={task_id}&label=85"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn submit_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let config = server_config(dir.path());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(&config)))
            .configure(routes::configure),
    )
    .await;

    let cases = [
        (serde_json::json!({ "file": "slab.obj" }), 400),
        (serde_json::json!({ "file": "../slab.pgm3d" }), 400),
        (serde_json::json!({ "file": "missing.pgm3d" }), 404),
        (serde_json::json!({ "file": "broken.pgm3d" }), 422),
        (serde_json::json!({ "file": "slab.pgm3d", "labels": 255 }), 400),
    ];

    for (payload, status) in cases {
        let req = test::TestRequest::post()
            .uri("/mesh/extract")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), status, "payload = {payload}");
    }

    let req = test::TestRequest::get()
        .uri("/mesh/task?task_id=unknown")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn root_lists_supported_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let config = server_config(dir.path());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(&config)))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["supported_extensions"], serde_json::json!(["pgm3d"]));
}

#[actix_web::test]
async fn repeated_submissions_write_separate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = server_config(dir.path());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(&config)))
            .configure(routes::configure),
    )
    .await;

    let mut task_ids = Vec::new();
    for (labels, layout) in [(2, "merged"), (2, "merged"), (2, "per-label")] {
        let req = test::TestRequest::post()
            .uri("/mesh/extract")
            .set_json(serde_json::json!({ "file": "slab.pgm3d", "labels": labels, "layout": layout }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        task_ids.push(body["task_id"].as_str().unwrap().to_string());
    }

    let mut output_paths = Vec::new();
    for task_id in &task_ids {
        let mut state = Value::Null;
        for _ in 0..100 {
            let req = test::TestRequest::get()
                .uri(&format!("/mesh/task?task_id={task_id}"))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            state = body["state"].clone();
            if state["status"] != "pending" {
                break;
            }
            actix_web::rt::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(state["status"], "done", "state = {state}");
        for output in state["report"]["outputs"].as_array().unwrap() {
            let path = output["path"].as_str().unwrap().to_string();
            assert!(path.contains(task_id.as_str()), "{path}");
            assert!(std::path::Path::new(&path).exists());
            output_paths.push(path);
        }
    }

    let before = output_paths.len();
    output_paths.sort();
    output_paths.dedup();
    assert_eq!(output_paths.len(), before);
}
