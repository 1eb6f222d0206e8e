use sea_orm::EntityTrait;

use hero_server::entity::image;
use hero_server::error::AppError;
use hero_server::models::hero::{HeroPatch, NewHero, NewImage};
use hero_server::service::HeroService;
use hero_server::store::{HeroStore, StoreError};

use crate::common::TestApp;

fn new_hero(nickname: &str, real_name: &str) -> NewHero {
    NewHero {
        nickname: nickname.to_string(),
        real_name: real_name.to_string(),
        origin_description: format!("Where {nickname} came from."),
        superpowers: vec!["flight".to_string()],
        catch_phrase: format!("{nickname} to the rescue!"),
    }
}

async fn image_exists(app: &TestApp, id: i32) -> bool {
    image::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .is_some()
}

fn png(bytes: &[u8]) -> NewImage {
    NewImage {
        data: bytes.to_vec(),
        mime_type: "image/png".to_string(),
        file_name: None,
    }
}

#[tokio::test]
async fn cover_image_is_the_lowest_id() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);

    let created = store
        .create_hero(
            new_hero("Cover", "Cover Person"),
            vec![png(b"first"), png(b"second"), png(b"third")],
        )
        .await
        .unwrap();
    assert_eq!(created.images.len(), 3);

    let listed = store.find_heroes(Some(0), Some(5)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].images.len(), 1);
    assert_eq!(listed[0].images[0].id, created.images[0].id);
    assert_eq!(listed[0].images[0].data, b"first".to_vec());

    let all = store.find_heroes(None, None).await.unwrap();
    assert_eq!(all[0].images, listed[0].images);
}

#[tokio::test]
async fn heroes_without_images_list_no_cover() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);
    store
        .create_hero(new_hero("Plain", "Plain Person"), vec![])
        .await
        .unwrap();

    let listed = store.find_heroes(None, None).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert!(listed[0].images.is_empty());
}

#[tokio::test]
async fn lookup_matches_names_across_fields() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);
    let created = store
        .create_hero(new_hero("Nyx", "Jane Doe"), vec![])
        .await
        .unwrap();

    let by_real_name = store
        .find_hero_by_nickname_or_real_name("Jane Doe", "Nobody")
        .await
        .unwrap();
    assert_eq!(by_real_name.map(|h| h.id), Some(created.hero.id));

    let by_nickname = store
        .find_hero_by_nickname_or_real_name("Someone", "Nyx")
        .await
        .unwrap();
    assert_eq!(by_nickname.map(|h| h.id), Some(created.hero.id));

    let none = store
        .find_hero_by_nickname_or_real_name("Someone", "Nobody")
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn duplicate_insert_is_reported_by_the_store() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);
    store
        .create_hero(new_hero("Nyx", "Jane Doe"), vec![])
        .await
        .unwrap();

    let err = store
        .create_hero(new_hero("Nyx", "Other Person"), vec![png(b"x")])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Duplicate(_)), "{err:?}");
    assert_eq!(store.count_heroes().await.unwrap(), 1);
}

#[tokio::test]
async fn store_duplicate_surfaces_as_conflict() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);
    store
        .create_hero(new_hero("Nyx", "Jane Doe"), vec![])
        .await
        .unwrap();
    let other = store
        .create_hero(new_hero("Vex", "John Roe"), vec![])
        .await
        .unwrap();

    let patch = HeroPatch {
        real_name: Some("Jane Doe".to_string()),
        ..Default::default()
    };
    let err = HeroService::new(&app.db)
        .update(other.hero.id, patch, vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
}

#[tokio::test]
async fn update_of_missing_hero_is_not_found() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);

    let err = store
        .update_hero(404, &HeroPatch::default(), vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn update_only_removes_images_of_the_target() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);
    let target = store
        .create_hero(new_hero("Target", "Target Person"), vec![png(b"t")])
        .await
        .unwrap();
    let other = store
        .create_hero(new_hero("Other", "Other Person"), vec![png(b"o")])
        .await
        .unwrap();

    let patch = HeroPatch {
        delete_images_ids: vec![target.images[0].id, other.images[0].id],
        ..Default::default()
    };
    let updated = store
        .update_hero(target.hero.id, &patch, vec![png(b"new")])
        .await
        .unwrap();

    assert_eq!(updated.images.len(), 1);
    assert_eq!(updated.images[0].data, b"new".to_vec());
    assert!(!image_exists(&app, target.images[0].id).await);
    assert!(image_exists(&app, other.images[0].id).await);
}

#[tokio::test]
async fn empty_patch_keeps_stored_fields() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);
    let created = store
        .create_hero(new_hero("Still", "Still Person"), vec![png(b"s")])
        .await
        .unwrap();

    let updated = store
        .update_hero(created.hero.id, &HeroPatch::default(), vec![])
        .await
        .unwrap();

    assert_eq!(updated.hero.nickname, created.hero.nickname);
    assert_eq!(updated.hero.real_name, created.hero.real_name);
    assert_eq!(updated.hero.superpowers, created.hero.superpowers);
    assert_eq!(updated.images, created.images);
}

#[tokio::test]
async fn delete_removes_hero_and_images() {
    let app = TestApp::spawn().await;
    let store = HeroStore::new(&app.db);
    let created = store
        .create_hero(new_hero("Gone", "Gone Person"), vec![png(b"a"), png(b"b")])
        .await
        .unwrap();

    let deleted = store.delete_hero(created.hero.id).await.unwrap();

    assert_eq!(deleted.hero.id, created.hero.id);
    assert_eq!(deleted.images, created.images);
    assert!(store.find_hero(created.hero.id).await.unwrap().is_none());
    for img in &created.images {
        assert!(!image_exists(&app, img.id).await);
    }
    assert_eq!(store.count_heroes().await.unwrap(), 0);

    let err = store.delete_hero(created.hero.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn service_rejects_empty_image_before_writing() {
    let app = TestApp::spawn().await;
    let service = HeroService::new(&app.db);
    let created = service
        .create(new_hero("Careful", "Careful Person"), vec![png(b"c")])
        .await
        .unwrap();

    let patch = HeroPatch {
        nickname: Some("Changed".to_string()),
        ..Default::default()
    };
    let err = service
        .update(created.id, patch, vec![png(b"")])
        .await
        .unwrap_err();

    match err {
        AppError::Validation(msg) => assert_eq!(msg, "image #1 does not contain any data"),
        other => panic!("unexpected error: {other:?}"),
    }
    let stored = service.get_one(created.id).await.unwrap();
    assert_eq!(stored.nickname, "Careful");
}

#[tokio::test]
async fn service_counts_pages_of_five() {
    let app = TestApp::spawn().await;
    let service = HeroService::new(&app.db);
    assert_eq!(service.get_pages().await.unwrap(), 0);

    for i in 0..11 {
        service
            .create(new_hero(&format!("H{i}"), &format!("P{i}")), vec![])
            .await
            .unwrap();
    }

    assert_eq!(service.get_pages().await.unwrap(), 3);
    assert_eq!(service.get_all(Some(3)).await.unwrap().len(), 1);
    assert!(matches!(
        service.get_all(Some(4)).await,
        Err(AppError::NotFound(_))
    ));
}
