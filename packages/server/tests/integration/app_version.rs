use serde_json::json;

use crate::common::{ApkForm, TestApp, routes};

mod direct_upload {
    use super::*;

    #[tokio::test]
    async fn publishes_a_version() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .upload_apk(
                ApkForm {
                    file_name: "release.apk",
                    bytes: b"PK-apk-bytes".to_vec(),
                    version_code: "3",
                    version_name: "1.3 beta",
                },
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["version_code"], 3);
        assert_eq!(res.body["version_name"], "1.3 beta");
        assert_eq!(res.body["file_size"], 12);
        assert_eq!(res.body["release_notes"], "Bug fixes");
        assert_eq!(res.body["is_active"], true);
        assert_eq!(res.body["is_mandatory"], false);
        assert_eq!(res.body["download_count"], 0);
        assert!(res.body["uploaded_by"].is_number());

        let file_name = res.body["file_name"].as_str().unwrap();
        assert!(file_name.starts_with("cmo_app_v1.3_beta_"), "{file_name}");
        assert!(app.apk_path(file_name).exists());
    }

    #[tokio::test]
    async fn version_code_must_exceed_the_latest_active() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(5, &token).await;

        for code in ["5", "4"] {
            let res = app
                .upload_apk(
                    ApkForm {
                        file_name: "app.apk",
                        bytes: b"apk".to_vec(),
                        version_code: code,
                        version_name: "old",
                    },
                    &token,
                )
                .await;

            assert_eq!(res.status, 409, "{code}: {}", res.text);
            assert_eq!(res.body["code"], "VERSION_CONFLICT");
            assert!(
                res.body["message"].as_str().unwrap().contains('6'),
                "{}",
                res.text
            );
        }

        let res = app
            .upload_apk(
                ApkForm {
                    file_name: "app.apk",
                    bytes: b"apk".to_vec(),
                    version_code: "6",
                    version_name: "1.6",
                },
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn rejected_upload_leaves_no_file_behind() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(5, &token).await;

        let res = app
            .upload_apk(
                ApkForm {
                    file_name: "app.apk",
                    bytes: b"apk".to_vec(),
                    version_code: "2",
                    version_name: "0.2",
                },
                &token,
            )
            .await;
        assert_eq!(res.status, 409);

        let apk_files = std::fs::read_dir(&app.config.storage.apk_dir)
            .unwrap()
            .count();
        assert_eq!(apk_files, 1);
        let incoming = app.config.storage.upload_dir.join(".incoming");
        assert_eq!(std::fs::read_dir(incoming).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_metadata_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .upload_apk(
                ApkForm {
                    file_name: "app.apk",
                    bytes: b"apk".to_vec(),
                    version_code: "",
                    version_name: "1.0",
                },
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_numeric_version_code_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .upload_apk(
                ApkForm {
                    file_name: "app.apk",
                    bytes: b"apk".to_vec(),
                    version_code: "abc",
                    version_name: "1.0",
                },
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_apk_file_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .upload_apk(
                ApkForm {
                    file_name: "notes.txt",
                    bytes: b"hello".to_vec(),
                    version_code: "1",
                    version_name: "1.0",
                },
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn second_apk_part_is_rejected_and_cleaned_up() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let apk = |bytes: &'static [u8], name: &'static str| {
            reqwest::multipart::Part::bytes(bytes).file_name(name)
        };
        let form = reqwest::multipart::Form::new()
            .part("apk", apk(b"first", "a.apk"))
            .part("apk", apk(b"second", "b.apk"))
            .text("version_code", "1")
            .text("version_name", "1.0");
        let res = app.multipart_with_token(routes::UPLOAD, form, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        let incoming = app.config.storage.upload_dir.join(".incoming");
        assert_eq!(std::fs::read_dir(incoming).unwrap().count(), 0);
        let versions = app.get_without_token(routes::VERSIONS).await;
        assert_eq!(versions.body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn file_is_required() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let form = reqwest::multipart::Form::new()
            .text("version_code", "1")
            .text("version_name", "1.0");
        let res = app.multipart_with_token(routes::UPLOAD, form, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn field_agent_cannot_publish() {
        let app = TestApp::spawn().await;
        let token = app.agent_token().await;

        let res = app
            .upload_apk(
                ApkForm {
                    file_name: "app.apk",
                    bytes: b"apk".to_vec(),
                    version_code: "1",
                    version_name: "1.0",
                },
                &token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn lists_active_versions_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(1, &token).await;
        app.publish_version(2, &token).await;

        let res = app.get_without_token(routes::VERSIONS).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let codes: Vec<i64> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["version_code"].as_i64().unwrap())
            .collect();
        assert_eq!(codes, vec![2, 1]);
    }

    #[tokio::test]
    async fn deactivated_versions_are_listed_only_with_all() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(1, &token).await;
        let newest = app.publish_version(2, &token).await;

        let res = app
            .put_with_token(&routes::version(newest), &json!({"is_active": false}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_active"], false);

        let active = app.get_without_token(routes::VERSIONS).await;
        assert_eq!(active.body["data"].as_array().unwrap().len(), 1);

        let all = app
            .get_without_token(&format!("{}?all=true", routes::VERSIONS))
            .await;
        assert_eq!(all.body["data"].as_array().unwrap().len(), 2);

        let latest = app.get_without_token(routes::LATEST).await;
        assert_eq!(latest.body["version_code"], 1);
    }

    #[tokio::test]
    async fn latest_without_versions_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::LATEST).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod check_update {
    use super::*;

    #[tokio::test]
    async fn up_to_date_device_gets_no_update() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(10, &token).await;

        let res = app.get_without_token(&routes::check_update(10)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["update_available"], false);
        assert_eq!(res.body["current_version"], 10);
        assert!(res.body["latest_version"].is_null());
    }

    #[tokio::test]
    async fn older_device_is_offered_the_latest() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(10, &token).await;

        let res = app.get_without_token(&routes::check_update(9)).await;

        assert_eq!(res.body["update_available"], true);
        assert_eq!(res.body["latest_version"]["version_code"], 10);
        assert_eq!(res.body["latest_version"]["version_name"], "1.10");
        assert!(
            res.body["latest_version"]["download_url"]
                .as_str()
                .unwrap()
                .starts_with("/uploads/apk/cmo_app_v1.10_")
        );
    }

    #[tokio::test]
    async fn no_versions_means_no_update() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::check_update(1)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["update_available"], false);
    }

    #[tokio::test]
    async fn version_code_is_required() {
        let app = TestApp::spawn().await;

        let missing = app.get_without_token(routes::CHECK_UPDATE).await;
        assert_eq!(missing.status, 400);
        assert_eq!(missing.body["code"], "VALIDATION_ERROR");

        let invalid = app
            .get_without_token(&format!("{}?version_code=abc", routes::CHECK_UPDATE))
            .await;
        assert_eq!(invalid.status, 400);
        assert_eq!(invalid.body["code"], "VALIDATION_ERROR");
    }
}

mod download {
    use super::*;

    #[tokio::test]
    async fn streams_the_apk_and_counts_downloads() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let id = app.publish_version(4, &token).await;

        let (status, bytes, headers) = app.get_bytes(&routes::download(id)).await;
        assert_eq!(status, 200);
        assert_eq!(bytes, b"apk-4");
        assert_eq!(
            headers["content-type"],
            "application/vnd.android.package-archive"
        );
        let disposition = headers["content-disposition"].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"cmo_app_v1.4_"));

        let (status, bytes, _) = app.get_bytes(routes::DOWNLOAD_LATEST).await;
        assert_eq!(status, 200);
        assert_eq!(bytes, b"apk-4");

        let latest = app.get_without_token(routes::LATEST).await;
        assert_eq!(latest.body["download_count"], 2);
    }

    #[tokio::test]
    async fn inactive_version_can_still_be_downloaded_by_id() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let id = app.publish_version(4, &token).await;
        app.put_with_token(&routes::version(id), &json!({"is_active": false}), &token)
            .await;

        let (status, _, _) = app.get_bytes(&routes::download(id)).await;
        assert_eq!(status, 200);

        let (status, _, _) = app.get_bytes(routes::DOWNLOAD_LATEST).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn unknown_version_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::download(999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.publish_version(4, &token).await;

        let latest = app.get_without_token(routes::LATEST).await;
        let file_name = latest.body["file_name"].as_str().unwrap();
        std::fs::remove_file(app.apk_path(file_name)).unwrap();

        let res = app.get_without_token(routes::DOWNLOAD_LATEST).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod manage {
    use super::*;

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let id = app.publish_version(1, &token).await;

        let res = app
            .put_with_token(&routes::version(id), &json!({"is_mandatory": true}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_mandatory"], true);
        assert_eq!(res.body["release_notes"], "Bug fixes");
        assert_eq!(res.body["is_active"], true);

        let res = app
            .put_with_token(
                &routes::version(id),
                &json!({"release_notes": "Hotfix"}),
                &token,
            )
            .await;
        assert_eq!(res.body["release_notes"], "Hotfix");
        assert_eq!(res.body["is_mandatory"], true);
    }

    #[tokio::test]
    async fn update_unknown_version_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .put_with_token(&routes::version(77), &json!({"is_active": false}), &token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_removes_row_and_file() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let id = app.publish_version(1, &token).await;
        let latest = app.get_without_token(routes::LATEST).await;
        let file_name = latest.body["file_name"].as_str().unwrap().to_string();

        let res = app.delete_with_token(&routes::version(id), &token).await;
        assert_eq!(res.status, 204, "{}", res.text);

        assert!(!app.apk_path(&file_name).exists());
        let res = app.get_without_token(&routes::download(id)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn field_agent_cannot_manage_versions() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let id = app.publish_version(1, &admin).await;
        let agent = app.agent_token().await;

        let res = app
            .put_with_token(&routes::version(id), &json!({"is_active": false}), &agent)
            .await;
        assert_eq!(res.status, 403);

        let res = app.delete_with_token(&routes::version(id), &agent).await;
        assert_eq!(res.status, 403);
    }
}
