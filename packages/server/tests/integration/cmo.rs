use serde_json::json;

use crate::common::{TestApp, routes};

/// Sync the given customer ids and return their server ids in order.
async fn seed_records(app: &TestApp, token: &str, customer_ids: &[&str]) -> Vec<i32> {
    let cmos: Vec<_> = customer_ids
        .iter()
        .map(|id| json!({"customer_id": id}))
        .collect();
    let res = app
        .post_with_token(routes::BULK_SYNC, &json!({"cmos": cmos}), token)
        .await;
    assert_eq!(res.status, 200, "seed_records failed: {}", res.text);

    res.body["success"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["server_id"].as_i64().unwrap() as i32)
        .collect()
}

#[tokio::test]
async fn lists_records_with_pagination() {
    let app = TestApp::spawn().await;
    let token = app.agent_token().await;
    seed_records(&app, &token, &["C1", "C2", "C3"]).await;

    let res = app
        .get_with_token(&format!("{}?page=1&per_page=2", routes::CMO), &token)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(res.body["data"][0]["customer_id"], "C3");
    assert_eq!(res.body["pagination"]["total"], 3);
    assert_eq!(res.body["pagination"]["total_pages"], 2);
    assert_eq!(res.body["pagination"]["per_page"], 2);
}

#[tokio::test]
async fn search_matches_customer_id_case_insensitively() {
    let app = TestApp::spawn().await;
    let token = app.agent_token().await;
    seed_records(&app, &token, &["DHK-100", "DHK-200", "CTG-100"]).await;

    let res = app
        .get_with_token(&format!("{}?search=dhk", routes::CMO), &token)
        .await;
    assert_eq!(res.body["pagination"]["total"], 2);

    // Wildcards in the search term are literal.
    let res = app
        .get_with_token(&format!("{}?search=%25", routes::CMO), &token)
        .await;
    assert_eq!(res.body["pagination"]["total"], 0);
}

#[tokio::test]
async fn get_returns_a_single_record() {
    let app = TestApp::spawn().await;
    let token = app.agent_token().await;
    let ids = seed_records(&app, &token, &["C1"]).await;

    let res = app.get_with_token(&routes::cmo(ids[0]), &token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["id"], ids[0]);
    assert_eq!(res.body["customer_id"], "C1");
    assert_eq!(res.body["is_apps_entry"], 1);
}

#[tokio::test]
async fn get_unknown_record_is_not_found() {
    let app = TestApp::spawn().await;
    let token = app.agent_token().await;

    let res = app.get_with_token(&routes::cmo(404), &token).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn deactivated_record_disappears_from_reads() {
    let app = TestApp::spawn().await;
    let agent = app.agent_token().await;
    let ids = seed_records(&app, &agent, &["C1", "C2"]).await;
    let admin = app.admin_token().await;

    let res = app.delete_with_token(&routes::cmo(ids[0]), &admin).await;
    assert_eq!(res.status, 204, "{}", res.text);

    let res = app.get_with_token(&routes::cmo(ids[0]), &agent).await;
    assert_eq!(res.status, 404);

    let list = app.get_with_token(routes::CMO, &agent).await;
    assert_eq!(list.body["pagination"]["total"], 1);

    let stats = app.get_with_token(routes::BULK_STATS, &agent).await;
    assert_eq!(stats.body["total_records"], 1);

    let again = app.delete_with_token(&routes::cmo(ids[0]), &admin).await;
    assert_eq!(again.status, 404);
}

#[tokio::test]
async fn field_agent_cannot_deactivate() {
    let app = TestApp::spawn().await;
    let token = app.agent_token().await;
    let ids = seed_records(&app, &token, &["C1"]).await;

    let res = app.delete_with_token(&routes::cmo(ids[0]), &token).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn reads_require_a_token() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::CMO).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}
