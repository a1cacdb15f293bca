mod common;

use bytes::Bytes;
use uuid::Uuid;

use cattery_admin::errors::AppError;
use cattery_admin::models::{
    CatUpdateRequest, Gender, MediaLifecycle, MediaListQuery, MediaType, MediaUpload,
    RegisterExternalMediaRequest,
};
use common::{TestApp, cat_request, png_bytes, spawn_app};

async fn upload_png(app: &TestApp, name: &str, cat_id: Option<Uuid>, size: u32) -> cattery_admin::models::MediaItem {
    app.state
        .media
        .upload(MediaUpload {
            name: name.to_string(),
            data: Bytes::from(png_bytes(size, size)),
            cat_id,
            uploaded_by: Some("alice".to_string()),
        })
        .await
        .unwrap()
}

async fn active_ids(app: &TestApp) -> Vec<Uuid> {
    let page = app.state.media.list_active(&MediaListQuery::default()).await.unwrap();
    page.items.into_iter().map(|m| m.id).collect()
}

async fn trash_ids(app: &TestApp) -> Vec<Uuid> {
    let page = app.state.media.list_trash(&MediaListQuery::default()).await.unwrap();
    page.items.into_iter().map(|m| m.id).collect()
}

#[tokio::test]
async fn test_upload_stores_file_and_records_dimensions() {
    let app = spawn_app(None).await;
    let item = upload_png(&app, "kitten.png", None, 3).await;

    assert_eq!(item.media_type, MediaType::Image);
    assert_eq!(item.mime_type.as_deref(), Some("image/png"));
    assert_eq!((item.width, item.height), (Some(3), Some(3)));
    assert_eq!(item.url, format!("http://cattery.test/api/media/{}/file", item.id));

    let path = item.path.clone().unwrap();
    assert!(app.media_dir.path().join(&path).exists());

    let (_, data) = app.state.media.read_file(&item.id).await.unwrap();
    assert_eq!(data, png_bytes(3, 3));
}

#[tokio::test]
async fn test_identical_upload_for_same_cat_is_reused() {
    let app = spawn_app(None).await;
    let first = upload_png(&app, "a.png", None, 4).await;
    let second = upload_png(&app, "b.png", None, 4).await;

    assert_eq!(first.id, second.id);
    assert_eq!(active_ids(&app).await.len(), 1);
}

#[tokio::test]
async fn test_identical_upload_is_reused_per_cat() {
    let app = spawn_app(None).await;
    let luna = app
        .state
        .cats
        .create(cat_request("Luna", Gender::Female), None)
        .await
        .unwrap();
    let milo = app
        .state
        .cats
        .create(cat_request("Milo", Gender::Male), None)
        .await
        .unwrap();

    let for_luna = upload_png(&app, "shared.png", Some(luna.id), 5).await;
    let milo_first = upload_png(&app, "shared.png", Some(milo.id), 5).await;
    let milo_second = upload_png(&app, "again.png", Some(milo.id), 5).await;

    assert_ne!(for_luna.id, milo_first.id);
    assert_eq!(milo_first.id, milo_second.id);

    let milo_items = app
        .state
        .media
        .list_active(&MediaListQuery {
            cat_id: Some(milo.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(milo_items.total, 1);
}

#[tokio::test]
async fn test_unsupported_content_is_rejected() {
    let app = spawn_app(None).await;
    let err = app
        .state
        .media
        .upload(MediaUpload {
            name: "notes.txt".to_string(),
            data: Bytes::from_static(b"just some text"),
            cat_id: None,
            uploaded_by: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
}

#[tokio::test]
async fn test_soft_delete_moves_item_to_trash_and_restore_reverses_it() {
    let app = spawn_app(None).await;
    let item = upload_png(&app, "tom.png", None, 2).await;
    assert_eq!(active_ids(&app).await, vec![item.id]);
    assert!(trash_ids(&app).await.is_empty());

    let trashed = app
        .state
        .media
        .soft_delete(&item.id, Some("alice".to_string()))
        .await
        .unwrap();
    assert!(trashed.deleted);
    assert!(trashed.deleted_at.is_some());
    assert_eq!(trashed.deleted_by.as_deref(), Some("alice"));
    assert_eq!(trashed.lifecycle(), MediaLifecycle::Trashed);
    assert!(active_ids(&app).await.is_empty());
    assert_eq!(trash_ids(&app).await, vec![item.id]);

    let again = app.state.media.soft_delete(&item.id, None).await.unwrap();
    assert_eq!(again.deleted_at, trashed.deleted_at);

    let restored = app.state.media.restore(&item.id, None).await.unwrap();
    assert!(!restored.deleted);
    assert!(restored.deleted_at.is_none());
    assert!(restored.deleted_by.is_none());
    assert_eq!(active_ids(&app).await, vec![item.id]);
    assert!(trash_ids(&app).await.is_empty());
}

#[tokio::test]
async fn test_restoring_active_item_is_rejected() {
    let app = spawn_app(None).await;
    let item = upload_png(&app, "tom.png", None, 2).await;
    let err = app.state.media.restore(&item.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_locked_item_cannot_be_purged_in_either_state() {
    let app = spawn_app(None).await;
    let item = upload_png(&app, "cover.png", None, 2).await;
    app.state
        .media
        .lock(&item.id, Some("homepage banner".to_string()), None)
        .await
        .unwrap();

    let err = app.state.media.permanent_delete(&item.id, None).await.unwrap_err();
    match err {
        AppError::MediaLocked { reason, .. } => assert_eq!(reason, "homepage banner"),
        other => panic!("expected MediaLocked, got {other:?}"),
    }

    app.state.media.soft_delete(&item.id, None).await.unwrap();
    let err = app.state.media.permanent_delete(&item.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::MediaLocked { .. }));
    assert_eq!(trash_ids(&app).await, vec![item.id]);

    app.state.media.unlock(&item.id, None).await.unwrap();
    app.state.media.permanent_delete(&item.id, None).await.unwrap();
    assert!(trash_ids(&app).await.is_empty());
    assert!(!app.media_dir.path().join(item.path.unwrap()).exists());
}

#[tokio::test]
async fn test_purge_removes_url_from_owning_cat() {
    let app = spawn_app(None).await;
    let cat = app
        .state
        .cats
        .create(cat_request("Luna", Gender::Female), None)
        .await
        .unwrap();
    let item = upload_png(&app, "luna.png", Some(cat.id), 2).await;

    app.state
        .cats
        .update(
            &cat.id,
            CatUpdateRequest {
                main_image: Some(Some(item.url.clone())),
                images: Some(vec![item.url.clone(), "https://cdn.test/other.jpg".to_string()]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    app.state.media.permanent_delete(&item.id, None).await.unwrap();

    let cat = app.state.cats.get(&cat.id, false).await.unwrap();
    assert!(cat.main_image.is_none());
    assert_eq!(cat.images, vec!["https://cdn.test/other.jpg".to_string()]);
}

#[tokio::test]
async fn test_empty_trash_skips_locked_items() {
    let app = spawn_app(None).await;
    let keep = upload_png(&app, "keep.png", None, 2).await;
    let purge_a = upload_png(&app, "a.png", None, 3).await;
    let purge_b = upload_png(&app, "b.png", None, 4).await;
    let active = upload_png(&app, "active.png", None, 5).await;

    for id in [keep.id, purge_a.id, purge_b.id] {
        app.state.media.soft_delete(&id, None).await.unwrap();
    }
    app.state.media.lock(&keep.id, None, None).await.unwrap();

    let result = app.state.media.empty_trash(Some("alice".to_string())).await.unwrap();
    assert_eq!(result.purged, 2);
    assert_eq!(result.skipped_locked, 1);
    assert_eq!(result.failed, 0);

    assert_eq!(trash_ids(&app).await, vec![keep.id]);
    assert_eq!(active_ids(&app).await, vec![active.id]);

    let stats = app.state.media.stats().await.unwrap();
    assert_eq!(stats.active, 1);
    assert_eq!(stats.trashed, 1);
    assert_eq!(stats.locked, 1);
}

#[tokio::test]
async fn test_register_external_requires_http_url() {
    let app = spawn_app(None).await;
    let request = |url: &str| RegisterExternalMediaRequest {
        name: "clip".to_string(),
        url: url.to_string(),
        media_type: MediaType::Video,
        cat_id: None,
    };

    let item = app
        .state
        .media
        .register_external(request("https://videos.test/clip.mp4"), None)
        .await
        .unwrap();
    assert!(item.path.is_none());
    assert_eq!(item.size, 0);

    let err = app
        .state
        .media
        .register_external(request("ftp://videos.test/clip.mp4"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = app.state.media.read_file(&item.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}
