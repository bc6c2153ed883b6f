mod common;

use anyhow::Result;

use publisher_api::authz::Permission;
use publisher_api::db::admin;
use publisher_api::errors::AppError;
use publisher_api::models::rbac::RoleGrants;

use common::{add_user, seed_firaxis, setup_db};

#[tokio::test]
async fn duplicates_are_signalled_as_already_exists() -> Result<()> {
    let db = setup_db().await?;
    let f = seed_firaxis(&db.pool).await?;
    let pool = &db.pool;
    let d = f.division.id;

    let again = admin::add_user_to_group(pool, d, f.civ_devs.id, f.ada.id).await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))), "got {:?}", again);

    let again = admin::assign_role_to_group(pool, d, f.civ_devs.id, f.civ_editor.id).await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));

    let again = admin::grant_permission_to_role(pool, d, f.civ_editor.id, Permission::Read).await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));

    let again = admin::create_group(pool, d, "civ-devs").await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));

    // External ids are unique across divisions, not just within one
    let other = admin::create_division(pool, "2K").await?;
    let again = add_user(pool, other.id, "ada@firaxis.com").await;
    assert!(again.is_err());

    Ok(())
}

#[tokio::test]
async fn cross_division_associations_are_rejected() -> Result<()> {
    let db = setup_db().await?;
    let f = seed_firaxis(&db.pool).await?;
    let pool = &db.pool;

    let other = admin::create_division(pool, "2K").await?;
    let outsider = add_user(pool, other.id, "gil@2k.com").await?;
    let foreign_game = admin::create_game(pool, other.id, "BioShock").await?;

    let join = admin::add_user_to_group(pool, f.division.id, f.civ_devs.id, outsider.id).await;
    assert!(matches!(join, Err(AppError::BadRequest(_))));

    let game = admin::assign_game_to_role(pool, f.division.id, f.civ_editor.id, foreign_game.id).await;
    assert!(matches!(game, Err(AppError::BadRequest(_))));

    let grants = admin::set_role_grants(
        pool,
        f.division.id,
        f.civ_editor.id,
        &RoleGrants {
            permissions: vec![Permission::Read],
            game_ids: vec![foreign_game.id],
        },
    )
    .await;
    assert!(matches!(grants, Err(AppError::BadRequest(_))));

    // The failed replacement left the role untouched
    let current = admin::role_grants(pool, f.division.id, f.civ_editor.id).await?;
    assert_eq!(current.game_ids, vec![f.civ6.id]);
    assert_eq!(current.permissions.len(), 3);

    Ok(())
}

#[tokio::test]
async fn removing_missing_associations_is_not_found() -> Result<()> {
    let db = setup_db().await?;
    let f = seed_firaxis(&db.pool).await?;
    let pool = &db.pool;
    let d = f.division.id;

    let result = admin::unassign_game_from_role(pool, d, f.civ_editor.id, f.xcom.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let result = admin::revoke_permission_from_role(pool, d, f.civ_editor.id, Permission::ChangeProduction).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    admin::remove_user_from_group(pool, d, f.civ_devs.id, f.ada.id).await?;
    let result = admin::remove_user_from_group(pool, d, f.civ_devs.id, f.ada.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn set_role_grants_replaces_both_sets() -> Result<()> {
    let db = setup_db().await?;
    let f = seed_firaxis(&db.pool).await?;

    let stored = admin::set_role_grants(
        &db.pool,
        f.division.id,
        f.civ_editor.id,
        &RoleGrants {
            permissions: vec![Permission::ChangeProduction, Permission::Update, Permission::Update],
            game_ids: vec![f.xcom.id, f.xcom.id],
        },
    )
    .await?;

    assert_eq!(stored.permissions, vec![Permission::Update, Permission::ChangeProduction]);
    assert_eq!(stored.game_ids, vec![f.xcom.id]);

    Ok(())
}

#[tokio::test]
async fn deleting_a_division_cascades() -> Result<()> {
    let db = setup_db().await?;
    let f = seed_firaxis(&db.pool).await?;

    admin::delete_division(&db.pool, f.division.id).await?;

    for table in ["users", "access_groups", "roles", "games", "user_groups", "group_roles", "role_games", "role_permissions"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&db.pool)
            .await?;
        assert_eq!(count, 0, "{table} should be empty");
    }

    // The catalog itself is not owned by any division
    let permissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(permissions, 8);

    Ok(())
}
