use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use fracture_prediction::{
    config::StorageConfig,
    storage::{FirebaseStorage, ObjectStore, StorageError},
};
use std::{collections::HashMap, path::PathBuf};
use tokio::net::TcpListener;

const BUCKET: &str = "radiodiagnosticoapp.firebasestorage.app";

async fn get_object(
    Path((bucket, object)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Vec<u8>, StatusCode> {
    if bucket != BUCKET || query.get("alt").map(String::as_str) != Some("media") {
        return Err(StatusCode::BAD_REQUEST);
    }
    match object.as_str() {
        "pacientes/juan/mano.png" => Ok(b"fake png bytes".to_vec()),
        "broken.png" => Err(StatusCode::SERVICE_UNAVAILABLE),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn spawn_emulator() -> String {
    let app = Router::new().route("/storage/v1/b/{bucket}/o/{object}", get(get_object));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

async fn emulator_storage() -> FirebaseStorage {
    let config = StorageConfig {
        bucket: BUCKET.to_string(),
        endpoint: "https://storage.googleapis.com".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        credentials_file: PathBuf::from("./does-not-exist.json"),
        emulator_host: Some(spawn_emulator().await),
        timeout_secs: 5,
    };
    FirebaseStorage::from_config(&config).unwrap().unwrap()
}

#[tokio::test]
async fn test_download_nested_object() {
    let storage = emulator_storage().await;
    assert_eq!(storage.bucket(), BUCKET);

    let bytes = storage.download("pacientes/juan/mano.png").await.unwrap();
    assert_eq!(bytes.as_ref(), b"fake png bytes");
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let storage = emulator_storage().await;

    let err = storage.download("pacientes/nadie/radio.dcm").await.unwrap_err();
    match err {
        StorageError::NotFound(path) => assert_eq!(path, "pacientes/nadie/radio.dcm"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let storage = emulator_storage().await;

    let err = storage.download("broken.png").await.unwrap_err();
    assert!(matches!(err, StorageError::Status { status: 503, .. }));
}
