//! Integration tests for UMP weighting data and the fakultas/prodi hierarchy

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_ump_crud() {
    let t = setup().await;
    let cookie = t.login_admin().await;

    let response = t
        .json("POST", "/pembobotan/ump", Some(&cookie), json!({"provinsi": "Sumatera Barat", "ump": "2994193"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Data UMP berhasil ditambahkan");
    assert_eq!(body["data"]["provinsi"], "Sumatera Barat");
    assert_eq!(body["data"]["ump"], 2994193.0);
    let id = body["data"]["id"].as_i64().unwrap();

    let response = t
        .json("POST", "/pembobotan/ump", Some(&cookie), json!({"provinsi": "Aceh", "ump": 3685615}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(t.get("/pembobotan/ump", Some(&cookie)).await).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["provinsi"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Aceh", "Sumatera Barat"]);

    let response = t
        .json("PUT", &format!("/pembobotan/ump/{}", id), Some(&cookie), json!({"provinsi": "Sumatera Barat", "ump": 3000000}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Data UMP berhasil diperbarui");

    let response = t.send(request("DELETE", &format!("/pembobotan/ump/{}", id), Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.send(request("DELETE", &format!("/pembobotan/ump/{}", id), Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Data UMP tidak ditemukan");

    let page = body_text(t.get("/pembobotan", Some(&cookie)).await).await;
    assert!(page.contains("Aceh"));
}

#[tokio::test]
async fn test_ump_validation() {
    let t = setup().await;
    let cookie = t.login_admin().await;

    let cases = [
        (json!({"provinsi": "Aceh"}), "Provinsi dan UMP harus diisi"),
        (json!({"provinsi": "", "ump": 100}), "Provinsi dan UMP harus diisi"),
        (json!({"provinsi": "Aceh", "ump": -5}), "UMP harus berupa angka positif"),
        (json!({"provinsi": "Aceh", "ump": "abc"}), "UMP harus berupa angka positif"),
    ];
    for (payload, message) in cases {
        let response = t.json("POST", "/pembobotan/ump", Some(&cookie), payload.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", payload);
        assert_eq!(body_json(response).await["message"], message, "{}", payload);
    }

    t.json("POST", "/pembobotan/ump", Some(&cookie), json!({"provinsi": "Aceh", "ump": 1})).await;
    let response = t.json("POST", "/pembobotan/ump", Some(&cookie), json!({"provinsi": "aceh", "ump": 2})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Provinsi sudah ada dalam database");

    let response = t.json("PUT", "/pembobotan/ump/999", Some(&cookie), json!({"provinsi": "Bali", "ump": 2})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ump_rename_to_existing_provinsi_rejected() {
    let t = setup().await;
    let cookie = t.login_admin().await;

    t.json("POST", "/pembobotan/ump", Some(&cookie), json!({"provinsi": "Aceh", "ump": 1})).await;
    let body = body_json(t.json("POST", "/pembobotan/ump", Some(&cookie), json!({"provinsi": "Bali", "ump": 2})).await).await;
    let bali = body["data"]["id"].as_i64().unwrap();

    let response = t
        .json("PUT", &format!("/pembobotan/ump/{}", bali), Some(&cookie), json!({"provinsi": "Aceh", "ump": 2}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Provinsi sudah ada dalam database");
}

#[tokio::test]
async fn test_ump_bulk_upsert() {
    let t = setup().await;
    let cookie = t.login_admin().await;

    t.json("POST", "/pembobotan/ump", Some(&cookie), json!({"provinsi": "Aceh", "ump": 1})).await;

    let response = t
        .json(
            "POST",
            "/pembobotan/ump",
            Some(&cookie),
            json!({"umpData": [
                {"provinsi": "Aceh", "ump": 3685615},
                {"provinsi": "Bali", "ump": "2813672"},
                {"provinsi": "", "ump": 5},
                {"provinsi": "Jambi"}
            ]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["results"],
        json!([
            {"provinsi": "Aceh", "action": "updated"},
            {"provinsi": "Bali", "action": "inserted"}
        ])
    );

    let ump: f64 = sqlx::query_scalar("SELECT ump FROM ump_data WHERE provinsi = 'Aceh'")
        .fetch_one(&t.db)
        .await
        .unwrap();
    assert_eq!(ump, 3685615.0);
}

#[tokio::test]
async fn test_fakultas_and_prodi_management() {
    let t = setup().await;
    let cookie = t.login_admin().await;

    let response = t.json("POST", "/api/fakultas", Some(&cookie), json!({"nama": "Teknik"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fakultas_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = t.json("POST", "/api/fakultas", Some(&cookie), json!({"nama": "teknik"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/api/fakultas/{}/prodi", fakultas_id);
    let response = t.json("POST", &uri, Some(&cookie), json!({"nama": "Teknik Sipil"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = t.json("POST", &uri, Some(&cookie), json!({"nama": "Teknik Sipil"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t.json("POST", "/api/fakultas/999/prodi", Some(&cookie), json!({"nama": "X"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t.json("POST", "/api/fakultas", Some(&cookie), json!({"nama": " "})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(t.get("/api/fakultas", Some(&cookie)).await).await;
    let tree = body["data"].as_array().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0]["nama"], "Teknik");
    assert_eq!(tree[0]["prodi"][0]["nama"], "Teknik Sipil");
}
