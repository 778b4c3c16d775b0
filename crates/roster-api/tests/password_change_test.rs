//! Integration tests for password-change validation.

use roster_api::password_change::{PasswordChangeInput, PasswordChangeValidator};
use roster_auth::{AuthConfig, DefaultPasswordPolicy};
use roster_core::error::RosterError;
use roster_core::models::user::{CreateUser, User};
use roster_core::repository::UserRepository;
use roster_core::validation::{REQUIRED, ValidationError};
use roster_db::repository::SurrealUserRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

const CURRENT: &str = "correct-horse-battery";
const NEXT: &str = "staple-lantern-river";

async fn setup() -> (
    PasswordChangeValidator<SurrealUserRepository<Db>, DefaultPasswordPolicy>,
    SurrealUserRepository<Db>,
    User,
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    roster_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db);
    let mut input = CreateUser::new("dana", "dana@example.com", CURRENT);
    input.first_name = "Dana".into();
    input.last_name = "Scully".into();
    let actor = users.create(input).await.unwrap();

    let validator = PasswordChangeValidator::new(users.clone(), DefaultPasswordPolicy::default());
    (validator, users, actor)
}

fn change(current: &str, new: &str, confirm: &str) -> PasswordChangeInput {
    PasswordChangeInput {
        current_password: Some(current.into()),
        new_password: Some(new.into()),
        confirm_password: Some(confirm.into()),
    }
}

fn validation(err: RosterError) -> ValidationError {
    match err {
        RosterError::Validation(v) => v,
        other => panic!("expected validation error, got: {other:?}"),
    }
}

#[tokio::test]
async fn valid_change_passes_and_has_no_side_effects() {
    let (validator, users, actor) = setup().await;

    validator
        .validate(change(CURRENT, NEXT, NEXT), &actor)
        .await
        .unwrap();

    let stored = users.get_by_id(actor.id).await.unwrap();
    assert_eq!(stored.password_hash, actor.password_hash);
}

#[tokio::test]
async fn wrong_current_password() {
    let (validator, _, actor) = setup().await;

    let err = validation(
        validator
            .validate(change("not-my-password", NEXT, NEXT), &actor)
            .await
            .unwrap_err(),
    );
    assert_eq!(
        err.messages("current_password"),
        ["Current password is incorrect."]
    );
    assert_eq!(err.fields().count(), 1);
}

#[tokio::test]
async fn mismatched_confirmation() {
    let (validator, _, actor) = setup().await;

    let err = validation(
        validator
            .validate(change(CURRENT, NEXT, "staple-lantern-rivers"), &actor)
            .await
            .unwrap_err(),
    );
    assert_eq!(
        err.messages("confirm_password"),
        ["New password fields didn't match."]
    );
    assert_eq!(err.fields().count(), 1);
}

#[tokio::test]
async fn new_password_must_satisfy_policy() {
    let (validator, _, actor) = setup().await;

    let err = validation(
        validator
            .validate(change(CURRENT, "password", "password"), &actor)
            .await
            .unwrap_err(),
    );
    assert_eq!(err.messages("new_password"), ["This password is too common."]);
}

#[tokio::test]
async fn new_password_compared_against_actor_attributes() {
    let (validator, _, actor) = setup().await;

    let err = validation(
        validator
            .validate(change(CURRENT, "scully-x-files", "scully-x-files"), &actor)
            .await
            .unwrap_err(),
    );
    assert_eq!(
        err.messages("new_password"),
        ["The password is too similar to the last name."]
    );
}

#[tokio::test]
async fn policy_settings_are_honoured() {
    let (_, users, actor) = setup().await;
    let config = AuthConfig {
        min_password_length: 24,
        ..Default::default()
    };
    let strict = PasswordChangeValidator::new(users, DefaultPasswordPolicy::new(&config));

    let err = validation(
        strict
            .validate(change(CURRENT, NEXT, NEXT), &actor)
            .await
            .unwrap_err(),
    );
    assert_eq!(
        err.messages("new_password"),
        ["This password is too short. It must contain at least 24 characters."]
    );
}

#[tokio::test]
async fn all_fields_are_required() {
    let (validator, _, actor) = setup().await;

    let err = validation(
        validator
            .validate(PasswordChangeInput::default(), &actor)
            .await
            .unwrap_err(),
    );
    for field in ["current_password", "new_password", "confirm_password"] {
        assert_eq!(err.messages(field), [REQUIRED], "field {field}");
    }
}

#[tokio::test]
async fn field_errors_suppress_confirmation_check() {
    let (validator, _, actor) = setup().await;

    let err = validation(
        validator
            .validate(change("not-my-password", NEXT, "something-else"), &actor)
            .await
            .unwrap_err(),
    );
    assert!(err.has_field("current_password"));
    assert!(!err.has_field("confirm_password"));
}

#[tokio::test]
async fn apply_stores_new_credential() {
    let (validator, users, actor) = setup().await;

    let validated = validator
        .validate(change(CURRENT, NEXT, NEXT), &actor)
        .await
        .unwrap();
    validated.apply(&users, &actor).await.unwrap();

    let stored = users.get_by_id(actor.id).await.unwrap();
    assert!(users.check_password(&stored, NEXT).await.unwrap());
    assert!(!users.check_password(&stored, CURRENT).await.unwrap());
}
