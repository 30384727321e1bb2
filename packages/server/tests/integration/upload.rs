use serde_json::json;

use crate::common::{TestApp, routes};

mod init {
    use super::*;

    #[tokio::test]
    async fn opens_a_session_with_server_limits() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::UPLOAD_INIT,
                &json!({
                    "file_name": "app.apk",
                    "file_size": 9,
                    "total_chunks": 3,
                    "version_code": 42,
                    "version_name": "4.2",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["upload_id"].as_str().is_some());
        assert_eq!(res.body["total_chunks"], 3);
        assert_eq!(res.body["max_chunk_size"], 1024);
    }

    #[tokio::test]
    async fn rejects_non_apk_file_names() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        for file_name in ["app.zip", "../app.apk", ".apk"] {
            let res = app
                .post_with_token(
                    routes::UPLOAD_INIT,
                    &json!({
                        "file_name": file_name,
                        "file_size": 9,
                        "total_chunks": 3,
                        "version_code": 1,
                        "version_name": "1.0",
                    }),
                    &token,
                )
                .await;

            assert_eq!(res.status, 400, "{file_name}: {}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn rejects_non_positive_counts() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        for (file_size, total_chunks) in [(0, 1), (9, 0), (9, -3)] {
            let res = app
                .post_with_token(
                    routes::UPLOAD_INIT,
                    &json!({
                        "file_name": "app.apk",
                        "file_size": file_size,
                        "total_chunks": total_chunks,
                        "version_code": 1,
                        "version_name": "1.0",
                    }),
                    &token,
                )
                .await;

            assert_eq!(res.status, 400, "{}", res.text);
        }
    }

    #[tokio::test]
    async fn requires_app_manage_permission() {
        let app = TestApp::spawn().await;
        let token = app.agent_token().await;

        let res = app
            .post_with_token(
                routes::UPLOAD_INIT,
                &json!({
                    "file_name": "app.apk",
                    "file_size": 9,
                    "total_chunks": 3,
                    "version_code": 1,
                    "version_name": "1.0",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::UPLOAD_INIT, &json!({}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod chunks {
    use super::*;

    #[tokio::test]
    async fn duplicate_index_does_not_change_received_count() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(9, 3, 1, &token).await;

        let first = app.upload_chunk(&upload_id, 1, b"BBB", &token).await;
        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(first.body["received_count"], 1);

        let again = app.upload_chunk(&upload_id, 1, b"XYZ", &token).await;
        assert_eq!(again.status, 200, "{}", again.text);
        assert_eq!(again.body["received_count"], 1);
        assert_eq!(again.body["chunk_index"], 1);
        assert_eq!(again.body["total_chunks"], 3);
    }

    #[tokio::test]
    async fn status_lists_received_and_missing_chunks() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(9, 3, 1, &token).await;

        app.upload_chunk(&upload_id, 2, b"CCC", &token).await;
        app.upload_chunk(&upload_id, 0, b"AAA", &token).await;

        let res = app.get_with_token(&routes::upload(&upload_id), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["received_count"], 2);
        assert_eq!(res.body["received_chunks"], json!([0, 2]));
        assert_eq!(res.body["missing_chunks"], json!([1]));
        assert_eq!(res.body["status"], "open");
        assert_eq!(res.body["version_code"], 1);
    }

    #[tokio::test]
    async fn index_out_of_range_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(9, 3, 1, &token).await;

        let res = app.upload_chunk(&upload_id, 3, b"DDD", &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn oversized_chunk_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(4096, 2, 1, &token).await;

        let res = app
            .upload_chunk(&upload_id, 0, &vec![7u8; 2048], &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .upload_chunk("00000000-0000-0000-0000-000000000000", 0, b"A", &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_form_fields_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let form = reqwest::multipart::Form::new().text("upload_id", "abc");
        let res = app
            .multipart_with_token(routes::UPLOAD_CHUNK, form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod complete {
    use super::*;

    #[tokio::test]
    async fn assembles_out_of_order_chunks_into_a_new_version() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(9, 3, 42, &token).await;

        for (index, data) in [(2, b"CCC"), (0, b"AAA"), (1, b"BBB")] {
            let res = app.upload_chunk(&upload_id, index, data, &token).await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let res = app
            .post_with_token(
                routes::UPLOAD_COMPLETE,
                &json!({"upload_id": upload_id}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["file_size"], 9);
        assert_eq!(res.body["file_size_formatted"], "9 Bytes");
        assert_eq!(res.body["version_code"], 42);
        assert_eq!(res.body["version_name"], "2.42");
        let file_name = res.body["file_name"].as_str().unwrap();
        assert!(file_name.starts_with("cmo_app_v2.42_"), "{file_name}");
        assert_eq!(
            res.body["file_path"],
            format!("/uploads/apk/{file_name}")
        );
        assert_eq!(
            std::fs::read(app.apk_path(file_name)).unwrap(),
            b"AAABBBCCC"
        );

        let check = app.get_without_token(&routes::check_update(41)).await;
        assert_eq!(check.status, 200, "{}", check.text);
        assert_eq!(check.body["update_available"], true);
        assert_eq!(check.body["current_version"], 41);
        assert_eq!(check.body["latest_version"]["version_code"], 42);
        assert_eq!(check.body["latest_version"]["file_size"], 9);
    }

    #[tokio::test]
    async fn rewritten_chunk_replaces_its_bytes() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(9, 3, 7, &token).await;

        app.upload_chunk(&upload_id, 0, b"AAA", &token).await;
        app.upload_chunk(&upload_id, 1, b"BBB", &token).await;
        app.upload_chunk(&upload_id, 2, b"CCC", &token).await;
        app.upload_chunk(&upload_id, 1, b"XYZ", &token).await;

        let res = app
            .post_with_token(
                routes::UPLOAD_COMPLETE,
                &json!({"upload_id": upload_id}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let file_name = res.body["file_name"].as_str().unwrap();
        assert_eq!(
            std::fs::read(app.apk_path(file_name)).unwrap(),
            b"AAAXYZCCC"
        );
    }

    #[tokio::test]
    async fn missing_chunk_blocks_completion_and_keeps_the_session() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(9, 3, 1, &token).await;

        app.upload_chunk(&upload_id, 0, b"AAA", &token).await;
        app.upload_chunk(&upload_id, 1, b"BBB", &token).await;

        let res = app
            .post_with_token(
                routes::UPLOAD_COMPLETE,
                &json!({"upload_id": upload_id}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "INCOMPLETE_UPLOAD");

        let status = app.get_with_token(&routes::upload(&upload_id), &token).await;
        assert_eq!(status.status, 200);
        assert_eq!(status.body["missing_chunks"], json!([2]));

        // Resuming with the missing chunk makes completion succeed.
        app.upload_chunk(&upload_id, 2, b"CCC", &token).await;
        let res = app
            .post_with_token(
                routes::UPLOAD_COMPLETE,
                &json!({"upload_id": upload_id}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn version_conflict_reopens_the_session() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(5, &token).await;

        let upload_id = app.init_upload(3, 1, 5, &token).await;
        app.upload_chunk(&upload_id, 0, b"AAA", &token).await;

        let res = app
            .post_with_token(
                routes::UPLOAD_COMPLETE,
                &json!({"upload_id": upload_id}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "VERSION_CONFLICT");

        let status = app.get_with_token(&routes::upload(&upload_id), &token).await;
        assert_eq!(status.status, 200);
        assert_eq!(status.body["status"], "open");
        assert_eq!(status.body["received_count"], 1);

        let versions = app.get_without_token(routes::VERSIONS).await;
        assert_eq!(versions.body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completed_session_is_gone() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(1, 1, 3, &token).await;
        app.upload_chunk(&upload_id, 0, b"A", &token).await;

        let res = app
            .post_with_token(
                routes::UPLOAD_COMPLETE,
                &json!({"upload_id": upload_id}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let status = app.get_with_token(&routes::upload(&upload_id), &token).await;
        assert_eq!(status.status, 404);

        let again = app
            .post_with_token(
                routes::UPLOAD_COMPLETE,
                &json!({"upload_id": upload_id}),
                &token,
            )
            .await;
        assert_eq!(again.status, 404);
    }
}

mod abort {
    use super::*;

    #[tokio::test]
    async fn discards_the_session() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let upload_id = app.init_upload(9, 3, 1, &token).await;
        app.upload_chunk(&upload_id, 0, b"AAA", &token).await;

        let res = app
            .delete_with_token(&routes::upload(&upload_id), &token)
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        let status = app.get_with_token(&routes::upload(&upload_id), &token).await;
        assert_eq!(status.status, 404);
        assert_eq!(status.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app.delete_with_token(&routes::upload("missing"), &token).await;

        assert_eq!(res.status, 404);
    }
}
