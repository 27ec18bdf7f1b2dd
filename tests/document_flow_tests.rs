/// End-to-end tests for signing keys, documents, rosters and agendas
mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, send_json, signed_in_cookies, test_app};
use serde_json::json;

#[tokio::test]
async fn key_lifecycle_and_external_shape() {
    let (_ctx, router) = test_app(vec!["chair".to_string()]).await;
    let chair = signed_in_cookies(&router, "chair", "correct horse battery", None).await;

    let created = send_json(
        &router,
        "POST",
        "/api/keys",
        Some(&chair),
        Some(json!({ "title": "Decision letters", "tag": "decision" })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);

    let body = body_json(created).await;
    let key = &body["data"];
    assert_eq!(key["tag"], "decision");
    assert_eq!(key["state"], "active");
    assert!(key["public_key"].as_str().unwrap().contains("BEGIN PUBLIC KEY"));
    assert!(key["private_key"]["encrypted_key"].as_str().is_some());
    assert!(key["private_key"]["metadata"]["iv"].as_str().is_some());
    // The wrap key is never part of the stored or exposed shape
    assert!(key["private_key"]["metadata"].get("key").is_none());

    // Duplicate tags are rejected while a key is live
    let duplicate = send_json(
        &router,
        "POST",
        "/api/keys",
        Some(&chair),
        Some(json!({ "title": "Another", "tag": "decision" })),
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let deleted = send_json(&router, "DELETE", "/api/keys/decision", Some(&chair), None).await;
    assert_eq!(deleted.status(), StatusCode::OK);

    let listed = send_json(&router, "GET", "/api/keys", Some(&chair), None).await;
    let body = body_json(listed).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn non_organizer_cannot_manage_keys() {
    let (_ctx, router) = test_app(vec![]).await;
    let alice = signed_in_cookies(&router, "alice", "correct horse battery", None).await;

    let response = send_json(
        &router,
        "POST",
        "/api/keys",
        Some(&alice),
        Some(json!({ "title": "Sneaky", "tag": "sneaky" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn document_signing_flow() {
    let (ctx, router) = test_app(vec!["chair".to_string()]).await;
    let chair = signed_in_cookies(&router, "chair", "correct horse battery", None).await;

    // Member profile for the signer, then an identity linked to it
    send_json(
        &router,
        "POST",
        "/api/members",
        Some(&chair),
        Some(json!({ "nim": "13519001", "full_name": "Alice Wijaya" })),
    )
    .await;
    let alice =
        signed_in_cookies(&router, "alice", "correct horse battery", Some("13519001")).await;

    send_json(
        &router,
        "POST",
        "/api/keys",
        Some(&chair),
        Some(json!({ "title": "Decision letters", "tag": "decision" })),
    )
    .await;

    let created = send_json(
        &router,
        "POST",
        "/api/documents",
        Some(&chair),
        Some(json!({
            "title": "Keputusan 01",
            "content": "Isi surat keputusan nomor satu",
            "tag": "decision",
            "signers": ["13519001"],
        })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);
    let doc_id = body_json(created).await["data"]["id"].as_str().unwrap().to_string();

    // Pending listing before signing
    let pending = send_json(
        &router,
        "GET",
        "/api/my-signatures?signed=false",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(body_json(pending).await["data"].as_array().unwrap().len(), 1);

    let signed = send_json(
        &router,
        "POST",
        &format!("/api/documents/{}/sign", doc_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(signed.status(), StatusCode::OK);
    assert!(body_json(signed).await["data"]["signature"].as_str().is_some());

    // Signing twice is a conflict
    let again = send_json(
        &router,
        "POST",
        &format!("/api/documents/{}/sign", doc_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let verified = send_json(
        &router,
        "GET",
        &format!("/api/documents/{}/verify?nim=13519001", doc_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(verified.status(), StatusCode::OK);
    assert_eq!(body_json(verified).await["data"]["valid"], true);

    let listing = send_json(
        &router,
        "GET",
        "/api/my-signatures?signed=true",
        Some(&alice),
        None,
    )
    .await;
    let body = body_json(listing).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "Keputusan 01");

    // The signing left an audit trail
    let audit = ctx.audit.list_recent(50).await.unwrap();
    assert!(audit.iter().any(|r| r.action == "document.sign"));
}

#[tokio::test]
async fn roster_drives_organizer_capability() {
    let (_ctx, router) = test_app(vec!["chair".to_string()]).await;
    let chair = signed_in_cookies(&router, "chair", "correct horse battery", None).await;

    send_json(
        &router,
        "POST",
        "/api/members",
        Some(&chair),
        Some(json!({ "nim": "13519001", "full_name": "Alice Wijaya" })),
    )
    .await;

    // Before any roster record, the public role query returns the defaults
    let before = send_json(&router, "GET", "/api/organizer?nim=13519001", None, None).await;
    let body = body_json(before).await;
    assert_eq!(body["data"]["role"], "Member");
    assert_eq!(body["data"]["organizer"], false);

    let now = Utc::now();
    let assign = send_json(
        &router,
        "POST",
        "/api/administration",
        Some(&chair),
        Some(json!({
            "period_start": now - Duration::days(1),
            "period_end": now + Duration::days(364),
            "role": "secretary",
            "member_nim": "13519001",
        })),
    )
    .await;
    assert_eq!(assign.status(), StatusCode::OK);

    let after = send_json(&router, "GET", "/api/organizer?nim=13519001", None, None).await;
    let body = body_json(after).await;
    assert_eq!(body["data"]["role"], "secretary");
    assert_eq!(body["data"]["organizer"], true);

    // The seat makes the linked identity an organizer end-to-end
    let alice =
        signed_in_cookies(&router, "alice", "correct horse battery", Some("13519001")).await;
    let created = send_json(
        &router,
        "POST",
        "/api/agenda",
        Some(&alice),
        Some(json!({
            "title": "Rapat kerja",
            "starts_at": now + Duration::days(7),
            "ends_at": now + Duration::days(8),
        })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::OK);
}

#[tokio::test]
async fn agenda_registration_honors_rules() {
    let (_ctx, router) = test_app(vec!["chair".to_string()]).await;
    let chair = signed_in_cookies(&router, "chair", "correct horse battery", None).await;

    for (nim, name) in [("13519001", "Alice"), ("13519002", "Bob")] {
        send_json(
            &router,
            "POST",
            "/api/members",
            Some(&chair),
            Some(json!({ "nim": nim, "full_name": name })),
        )
        .await;
    }
    let alice =
        signed_in_cookies(&router, "alice", "correct horse battery", Some("13519001")).await;

    let now = Utc::now();
    let open = send_json(
        &router,
        "POST",
        "/api/agenda",
        Some(&chair),
        Some(json!({
            "title": "Open house",
            "starts_at": now + Duration::days(7),
            "ends_at": now + Duration::days(8),
            "registration_rule": "All",
        })),
    )
    .await;
    let open_id = body_json(open).await["data"]["id"].as_str().unwrap().to_string();

    let admin_only = send_json(
        &router,
        "POST",
        "/api/agenda",
        Some(&chair),
        Some(json!({
            "title": "Officers meeting",
            "starts_at": now + Duration::days(7),
            "ends_at": now + Duration::days(8),
            "registration_rule": "Admin",
        })),
    )
    .await;
    let admin_id = body_json(admin_only).await["data"]["id"].as_str().unwrap().to_string();

    // Plain member joins the open agenda
    let joined = send_json(
        &router,
        "POST",
        &format!("/api/agenda/{}/participant", open_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(joined.status(), StatusCode::OK);

    // Duplicate registration is a conflict
    let twice = send_json(
        &router,
        "POST",
        &format!("/api/agenda/{}/participant", open_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(twice.status(), StatusCode::CONFLICT);

    // The admin-only agenda rejects a plain member
    let rejected = send_json(
        &router,
        "POST",
        &format!("/api/agenda/{}/participant", admin_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::FORBIDDEN);

    // Committee registration then approval by an organizer
    let committee = send_json(
        &router,
        "POST",
        &format!("/api/agenda/{}/committee", open_id),
        Some(&alice),
        Some(json!({ "job": "logistics" })),
    )
    .await;
    assert_eq!(committee.status(), StatusCode::OK);

    let approved = send_json(
        &router,
        "POST",
        &format!("/api/agenda/{}/committee/13519001/approve", open_id),
        Some(&chair),
        None,
    )
    .await;
    assert_eq!(approved.status(), StatusCode::OK);

    let entries = send_json(
        &router,
        "GET",
        &format!("/api/agenda/{}/committee", open_id),
        Some(&alice),
        None,
    )
    .await;
    let body = body_json(entries).await;
    assert_eq!(body["data"][0]["approved"], true);
}

#[tokio::test]
async fn audit_listing_is_organizer_only() {
    let (_ctx, router) = test_app(vec!["chair".to_string()]).await;
    let chair = signed_in_cookies(&router, "chair", "correct horse battery", None).await;
    let alice = signed_in_cookies(&router, "alice", "correct horse battery", None).await;

    let forbidden = send_json(&router, "GET", "/api/audit", Some(&alice), None).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let allowed = send_json(&router, "GET", "/api/audit", Some(&chair), None).await;
    assert_eq!(allowed.status(), StatusCode::OK);

    // Sign-ins from this test are in the log
    let body = body_json(allowed).await;
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["action"] == "auth.signin"));
}
