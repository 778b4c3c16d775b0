//! Integration tests for the Identity Store using in-memory SurrealDB.

use roster_core::error::RosterError;
use roster_core::models::permission::CreatePermission;
use roster_core::models::role::CreateRole;
use roster_core::models::user::{CreateUser, UpdateUser, User};
use roster_core::repository::{
    PermissionRepository, PermissionSource, RoleRepository, UserRepository,
};
use roster_db::repository::{
    BACKUP_CODE_COUNT, SurrealPermissionRepository, SurrealRoleRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    roster_db::run_migrations(&db).await.unwrap();
    db
}

async fn create_alice(repo: &SurrealUserRepository<Db>) -> User {
    repo.create(CreateUser::new(
        "alice",
        "alice@Example.COM",
        "correct-horse-battery",
    ))
    .await
    .unwrap()
}

fn sorted(mut codes: Vec<String>) -> Vec<String> {
    codes.sort();
    codes
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = setup().await;
    roster_db::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn create_and_get_user() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let creator = Uuid::new_v4();

    let mut input = CreateUser::new("alice", "alice@Example.COM", "correct-horse-battery");
    input.first_name = "Alice".into();
    input.created_by = Some(creator);
    let user = repo.create(input).await.unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.first_name, "Alice");
    assert!(user.is_active);
    assert!(!user.is_staff);
    assert!(!user.is_superuser);
    assert!(!user.two_factor_enabled);
    assert!(user.backup_codes.is_empty());
    assert_eq!(user.created_by, Some(creator));
    assert!(user.last_login.is_none());
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert_ne!(user.password_hash, "correct-horse-battery");

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.created_by, Some(creator));

    let by_name = repo.get_by_username("alice").await.unwrap();
    assert_eq!(by_name.id, user.id);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let err = repo.get_by_username("nobody").await.unwrap_err();
    assert!(matches!(err, RosterError::NotFound { .. }));

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RosterError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    create_alice(&repo).await;

    let err = repo
        .create(CreateUser::new("alice", "other@example.com", "another-long-secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, RosterError::AlreadyExists { ref entity } if entity == "user"));
}

#[tokio::test]
async fn renaming_onto_taken_username_is_rejected() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    create_alice(&repo).await;
    let bob = repo
        .create(CreateUser::new("bob", "bob@example.com", "another-long-secret"))
        .await
        .unwrap();

    let err = repo
        .update(
            bob.id,
            UpdateUser {
                username: Some("alice".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RosterError::AlreadyExists { .. }));
    assert_eq!(repo.get_by_id(bob.id).await.unwrap().username, "bob");
}

#[tokio::test]
async fn partial_update_changes_only_given_fields() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let user = create_alice(&repo).await;

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                last_name: Some("Liddell".into()),
                is_staff: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.last_name, "Liddell");
    assert!(updated.is_staff);
    assert_eq!(updated.username, "alice");
    assert_eq!(updated.password_hash, user.password_hash);
    assert_eq!(updated.date_joined, user.date_joined);

    let unchanged = repo.update(user.id, UpdateUser::default()).await.unwrap();
    assert_eq!(unchanged.last_name, "Liddell");
}

#[tokio::test]
async fn set_password_rehashes() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let user = create_alice(&repo).await;

    assert!(repo.check_password(&user, "correct-horse-battery").await.unwrap());

    repo.set_password(user.id, "new-staple-secret").await.unwrap();
    let user = repo.get_by_id(user.id).await.unwrap();

    assert!(user.password_hash.starts_with("$argon2id$"));
    assert!(repo.check_password(&user, "new-staple-secret").await.unwrap());
    assert!(!repo.check_password(&user, "correct-horse-battery").await.unwrap());
}

#[tokio::test]
async fn set_password_on_missing_user_fails() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let err = repo
        .set_password(Uuid::new_v4(), "new-staple-secret")
        .await
        .unwrap_err();
    assert!(matches!(err, RosterError::NotFound { .. }));
}

#[tokio::test]
async fn pepper_is_required_for_verification() {
    let db = setup().await;
    let peppered = SurrealUserRepository::with_pepper(db.clone(), "pepper!".into());
    let plain = SurrealUserRepository::new(db);

    let user = create_alice(&peppered).await;
    assert!(peppered.check_password(&user, "correct-horse-battery").await.unwrap());
    assert!(!plain.check_password(&user, "correct-horse-battery").await.unwrap());
}

#[tokio::test]
async fn record_login_stamps_last_login() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let user = create_alice(&repo).await;

    repo.record_login(user.id).await.unwrap();
    let user = repo.get_by_id(user.id).await.unwrap();
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn two_factor_and_backup_codes() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let user = create_alice(&repo).await;

    repo.set_two_factor(user.id, true).await.unwrap();
    let codes = repo.regenerate_backup_codes(user.id).await.unwrap();
    assert_eq!(codes.len(), BACKUP_CODE_COUNT);

    let user = repo.get_by_id(user.id).await.unwrap();
    assert!(user.two_factor_enabled);
    assert_eq!(user.backup_codes, codes);

    repo.set_two_factor(user.id, false).await.unwrap();
    let user = repo.get_by_id(user.id).await.unwrap();
    assert!(!user.two_factor_enabled);
    assert!(user.backup_codes.is_empty());
}

// ---------------------------------------------------------------------------
// Roles, permissions, and the effective permission source
// ---------------------------------------------------------------------------

#[tokio::test]
async fn role_assignment_lifecycle() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db);
    let user = create_alice(&users).await;

    let role = roles
        .create(CreateRole {
            name: "editor".into(),
            description: "Edits things".into(),
        })
        .await
        .unwrap();
    assert_eq!(roles.get_by_id(role.id).await.unwrap().name, "editor");

    let assignment = roles.assign_to_user(user.id, role.id).await.unwrap();
    assert!(assignment.is_active);
    assert_eq!(assignment.role_id, role.id);
    assert_eq!(assignment.user_id, user.id);

    let assignment = roles
        .set_assignment_active(user.id, role.id, false)
        .await
        .unwrap();
    assert!(!assignment.is_active);

    let all = roles.get_user_assignments(user.id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(!all[0].is_active);
}

#[tokio::test]
async fn duplicate_codes_and_assignments_already_exist() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db);
    let user = create_alice(&users).await;

    let view = CreatePermission {
        code: "view_x".into(),
        name: "View X".into(),
    };
    perms.create(view.clone()).await.unwrap();
    let err = perms.create(view).await.unwrap_err();
    assert!(
        matches!(err, RosterError::AlreadyExists { ref entity } if entity == "permission")
    );

    let role = roles
        .create(CreateRole {
            name: "viewer".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    roles.assign_to_user(user.id, role.id).await.unwrap();
    let err = roles.assign_to_user(user.id, role.id).await.unwrap_err();
    assert!(matches!(err, RosterError::AlreadyExists { ref entity } if entity == "has_role"));
}

#[tokio::test]
async fn deactivating_unknown_assignment_is_not_found() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let err = roles
        .set_assignment_active(Uuid::new_v4(), Uuid::new_v4(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, RosterError::NotFound { .. }));
}

#[tokio::test]
async fn permission_source_honours_active_flag() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db);
    let user = create_alice(&users).await;

    let view_x = perms
        .create(CreatePermission {
            code: "view_x".into(),
            name: "View X".into(),
        })
        .await
        .unwrap();
    let edit_y = perms
        .create(CreatePermission {
            code: "edit_y".into(),
            name: "Edit Y".into(),
        })
        .await
        .unwrap();
    assert_eq!(perms.get_by_code("edit_y").await.unwrap().id, edit_y.id);

    let role = roles
        .create(CreateRole {
            name: "r".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    perms.grant_to_role(role.id, edit_y.id).await.unwrap();
    perms.grant_to_user(user.id, view_x.id).await.unwrap();
    roles.assign_to_user(user.id, role.id).await.unwrap();

    let granted = perms.get_role_permissions(role.id).await.unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].code, "edit_y");

    assert_eq!(perms.direct_codes(&user).await.unwrap(), ["view_x"]);
    assert_eq!(perms.active_role_codes(&user).await.unwrap(), ["edit_y"]);

    roles
        .set_assignment_active(user.id, role.id, false)
        .await
        .unwrap();
    assert!(perms.active_role_codes(&user).await.unwrap().is_empty());
    assert_eq!(sorted(perms.direct_codes(&user).await.unwrap()), ["view_x"]);
}
