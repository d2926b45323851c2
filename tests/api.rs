use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use helpdesk_reports::app_state::AppState;
use helpdesk_reports::config::DEFAULT_BODY_LIMIT_BYTES;
use helpdesk_reports::models::DEFAULT_ROSTER;
use helpdesk_reports::router::create_router;
use helpdesk_reports::store::MemoryStore;

struct TestApp {
    router: Router,
    uploads: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let roster = DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect();
        let state = AppState::in_memory(MemoryStore::new(), roster, uploads.path().to_path_buf());
        Self {
            router: create_router(state, DEFAULT_BODY_LIMIT_BYTES),
            uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn report_body(descripcion: &str, timestamp: &str) -> Value {
    json!({
        "departamento": ["TESORERÍA", "CABILDO"],
        "descripcion": descripcion,
        "tipoProblema": "Hardware - Impresoras",
        "quienReporta": "Ana",
        "prioridad": "Alta",
        "status": "Resuelto",
        "timestamp": timestamp,
    })
}

fn multipart_body(boundary: &str, data: &Value, images: usize) -> Vec<u8> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{data}\r\n",
        b = boundary,
        data = data
    )
    .into_bytes();
    for i in 0..images {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"imagenes\"; filename=\"foto{i}.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA{i}\r\n",
                b = boundary,
                i = i
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

fn multipart_request(data: &Value, images: usize) -> Request<Body> {
    let boundary = "helpdesk-boundary";
    Request::builder()
        .method(Method::POST)
        .uri("/api/reportes")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, data, images)))
        .unwrap()
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = TestApp::new();
    let (status, body) = app.json(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "helpdesk-reports");

    let (status, version) = app.json(Method::GET, "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["service"], "helpdesk-reports");
    assert!(!version["version"].as_str().unwrap().is_empty());

    let (status, doc) = app.json(Method::GET, "/api/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/reportes"].is_object());
    assert!(doc["paths"]["/version"].is_object());
    let create_body = &doc["paths"]["/api/reportes"]["post"]["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(create_body["$ref"], "#/components/schemas/NewReport");
    let conflict = &doc["paths"]["/api/register"]["post"]["responses"]["409"]["content"]["application/json"]["schema"];
    assert_eq!(conflict["$ref"], "#/components/schemas/MessageResponse");
}

#[tokio::test]
async fn test_create_then_list_newest_first() {
    let app = TestApp::new();
    let (status, created) = app
        .json(
            Method::POST,
            "/api/reportes",
            Some(report_body("Impresora sin tóner", "2025-03-01T10:00:00Z")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["message"], "Reporte guardado correctamente");
    let first_id = created["id"].as_str().unwrap().to_string();
    assert!(first_id.starts_with("R-"));

    app.json(
        Method::POST,
        "/api/reportes",
        Some(report_body("Red caída en planta baja", "2025-03-05T10:00:00Z")),
    )
    .await;

    let (status, list) = app.json(Method::GET, "/api/reportes", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["descripcion"], "Red caída en planta baja");
    assert_eq!(list[1]["id"], first_id.as_str());
    assert_eq!(list[1]["status"], "Pendiente");
    assert_eq!(list[1]["departamento"], json!(["TESORERÍA", "CABILDO"]));
    let assignee = list[1]["asignadoA"].as_str().unwrap();
    assert!(DEFAULT_ROSTER.contains(&assignee));
}

#[tokio::test]
async fn test_duplicate_client_id_conflicts() {
    let app = TestApp::new();
    let mut body = report_body("Monitor dañado", "2025-03-01T10:00:00Z");
    body["id"] = json!("R-manual-1");
    let (status, created) = app.json(Method::POST, "/api/reportes", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "R-manual-1");
    let (status, _) = app.json(Method::POST, "/api/reportes", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, err) = app.json(Method::POST, "/api/reportes", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["message"].is_string());
}

#[tokio::test]
async fn test_patch_status_keeps_timestamp() {
    let app = TestApp::new();
    let (_, created) = app
        .json(
            Method::POST,
            "/api/reportes",
            Some(report_body("Teclado no responde", "2025-03-10T09:00:00Z")),
        )
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .json(
            Method::PATCH,
            &format!("/api/reportes/{}", id),
            Some(json!({"status": "En Proceso", "prioridad": "Crítica"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Reporte actualizado correctamente");

    let (_, list) = app.json(Method::GET, "/api/reportes", None).await;
    assert_eq!(list[0]["status"], "En Proceso");
    assert_eq!(list[0]["prioridad"], "Crítica");
    assert_eq!(list[0]["timestamp"], "2025-03-10T09:00:00Z");
}

#[tokio::test]
async fn test_unknown_report_is_404() {
    let app = TestApp::new();
    let (status, body) = app
        .json(Method::PATCH, "/api/reportes/R-nope", Some(json!({"status": "Resuelto"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Reporte no encontrado");

    let (status, body) = app.json(Method::DELETE, "/api/reportes/R-nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Reporte no encontrado");
}

#[tokio::test]
async fn test_delete_removes_report() {
    let app = TestApp::new();
    let (_, created) = app
        .json(
            Method::POST,
            "/api/reportes",
            Some(report_body("Licencia vencida", "2025-03-10T09:00:00Z")),
        )
        .await;
    let uri = format!("/api/reportes/{}", created["id"].as_str().unwrap());
    let (status, body) = app.json(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Reporte eliminado correctamente");
    let (_, list) = app.json(Method::GET, "/api/reportes", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new();
    let user = json!({
        "nombre": "Ana",
        "email": "ana@municipio.gob.mx",
        "password": "secreta123",
        "rol": "admin"
    });
    let (status, body) = app.json(Method::POST, "/api/register", Some(user.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["usuario"]["email"], "ana@municipio.gob.mx");
    assert!(body["usuario"].get("password").is_none());

    let (status, body) = app.json(Method::POST, "/api/register", Some(user)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "El usuario ya existe");

    let (status, body) = app
        .json(Method::POST, "/api/register", Some(json!({"email": "x@y.z"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Faltan campos requeridos");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/login",
            Some(json!({"email": "ana@municipio.gob.mx", "password": "secreta123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login exitoso");
    assert_eq!(body["usuario"]["rol"], "admin");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/login",
            Some(json!({"email": "ana@municipio.gob.mx", "password": "otra"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Contraseña incorrecta");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/login",
            Some(json!({"email": "nadie@municipio.gob.mx", "password": "secreta123"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Usuario no encontrado");
}

#[tokio::test]
async fn test_stats_over_all_reports() {
    let app = TestApp::new();
    for (descripcion, ts) in [
        ("Impresora atascada otra vez", "2024-06-03T15:00:00Z"),
        ("Sin acceso al sistema de nómina", "2024-06-04T15:00:00Z"),
    ] {
        app.json(Method::POST, "/api/reportes", Some(report_body(descripcion, ts)))
            .await;
    }

    let (status, stats) = app.json(Method::GET, "/api/reportes/stats?fecha=todos", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["kpis"]["total"], 2);
    assert_eq!(stats["kpis"]["pendientes"], 2);
    assert_eq!(stats["porDepartamento"]["CABILDO"], 2);
    assert_eq!(stats["porDepartamento"]["TESORERÍA"], 2);
    assert_eq!(stats["porPrioridad"].as_array().unwrap().len(), 4);

    let (status, stats) = app.json(Method::GET, "/api/reportes/stats?fecha=2023", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["kpis"]["total"], 0);

    let (status, body) = app.json(Method::GET, "/api/reportes/stats?fecha=siempre", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("siempre"));
}

#[tokio::test]
async fn test_export_csv_download() {
    let app = TestApp::new();
    app.json(
        Method::POST,
        "/api/reportes",
        Some(report_body("Proyector sin señal", "2025-02-01T12:00:00Z")),
    )
    .await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/reportes/export?format=csv")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"reportes_municipales_"));
    assert!(disposition.ends_with(".csv\""));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("Proyector sin señal"));
    assert!(text.contains("TESORERÍA, CABILDO"));

    let (status, _) = app.json(Method::GET, "/api/reportes/export?format=xml", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_multipart_upload_stores_images() {
    let app = TestApp::new();
    let data = report_body("Pantalla rota en recepción", "2025-03-01T10:00:00Z");
    let (status, bytes) = app.send(multipart_request(&data, 2)).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&bytes).unwrap();

    let (_, list) = app.json(Method::GET, "/api/reportes", None).await;
    assert_eq!(list[0]["id"], created["id"]);
    let images = list[0]["imagenes"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    for image in images {
        let name = image.as_str().unwrap();
        assert!(name.ends_with(".png"));
        assert!(app.uploads.path().join(name).exists());
    }
}

#[tokio::test]
async fn test_multipart_rejects_more_than_ten_images() {
    let app = TestApp::new();
    let data = report_body("Demasiadas fotos", "2025-03-01T10:00:00Z");
    let (status, bytes) = app.send(multipart_request(&data, 11)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "se permiten como máximo 10 imágenes");

    let (_, list) = app.json(Method::GET, "/api/reportes", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_client_patches_and_deletes_ids_with_reserved_characters() {
    use helpdesk_reports::client::ApiClient;
    use helpdesk_reports::models::{NewReport, ReportPatch, Status};
    use std::time::Duration;

    let app = TestApp::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5), vec![]).unwrap();
    for id in ["R 1#x", "A/B", "q?x=1"] {
        let report = NewReport {
            id: Some(id.to_string()),
            departamento: vec!["DIF".to_string()],
            descripcion: "Equipo sin red desde la mañana".to_string(),
            tipo_problema: "Hardware - Red/Internet".to_string(),
            quien_reporta: "Ana".to_string(),
            ..Default::default()
        };
        assert_eq!(client.create_report(&report).await.unwrap().id, id);

        let patch = ReportPatch {
            status: Some(Status::Resuelto),
            ..Default::default()
        };
        client.update_report(id, &patch).await.unwrap();
        let listed = client.list_reports().await.unwrap();
        let stored = listed.iter().find(|r| r.id == id).unwrap();
        assert_eq!(stored.status, Status::Resuelto);

        client.delete_report(id).await.unwrap();
        let listed = client.list_reports().await.unwrap();
        assert!(listed.iter().all(|r| r.id != id));
    }
}

#[tokio::test]
async fn test_conflicting_multipart_keeps_no_upload() {
    let app = TestApp::new();
    let mut data = report_body("Lector de huella sin respuesta", "2025-03-01T10:00:00Z");
    data["id"] = json!("R-1");
    let files_on_disk = || std::fs::read_dir(app.uploads.path()).unwrap().count();

    let (status, _) = app.send(multipart_request(&data, 1)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(files_on_disk(), 1);

    let (status, _) = app.send(multipart_request(&data, 1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(files_on_disk(), 1);
}
