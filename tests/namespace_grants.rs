mod common;

use anyhow::Result;

use publisher_api::authz::{
    AccessRequest, AuthzError, NamespaceResolver, Permission, Principal, Resolver,
    RoutingResolver,
};
use publisher_api::db::admin;
use publisher_api::errors::AppError;
use publisher_api::models::rbac::NamespaceGrantRequest;

use common::{add_role, add_user, setup_db, store};

#[tokio::test]
async fn grants_follow_wildcard_containment() -> Result<()> {
    let db = setup_db().await?;
    let pool = &db.pool;
    let division = admin::create_division(pool, "2K").await?;
    let user = add_user(pool, division.id, "dana@2k.com").await?;
    let viewer = add_role(pool, division.id, "viewer", &[Permission::Read], &[]).await?;
    let editor = add_role(pool, division.id, "editor", &[Permission::Read, Permission::Update], &[]).await?;

    admin::add_namespace_grant(
        pool,
        division.id,
        user.id,
        &NamespaceGrantRequest {
            role_id: viewer.id,
            namespace: "/2k/*".to_string(),
        },
    )
    .await?;
    admin::add_namespace_grant(
        pool,
        division.id,
        user.id,
        &NamespaceGrantRequest {
            role_id: editor.id,
            namespace: "/2k/games/nba".to_string(),
        },
    )
    .await?;

    let resolver = NamespaceResolver::new(store(pool));
    let dana = Principal::new("dana@2k.com");

    assert!(resolver.can_read_namespace(&dana, "/2k/games/bioshock").await?);
    assert!(resolver.can_read_namespace(&dana, "/2k").await?);
    assert!(!resolver.can_read_namespace(&dana, "/firaxis/games/civ6").await?);

    // Writing needs `update`, which only the exact nba grant carries
    assert!(resolver.can_write_namespace(&dana, "/2k/games/nba").await?);
    assert!(resolver.can_write_namespace(&dana, "/2k/games/nba/rosters").await?);
    assert!(!resolver.can_write_namespace(&dana, "/2k/games/bioshock").await?);

    Ok(())
}

#[tokio::test]
async fn grant_rows_hold_the_role_without_group_membership() -> Result<()> {
    let db = setup_db().await?;
    let pool = &db.pool;
    let division = admin::create_division(pool, "2K").await?;
    let user = add_user(pool, division.id, "dana@2k.com").await?;
    let viewer = add_role(pool, division.id, "viewer", &[Permission::Read], &[]).await?;

    // Dana is in a group holding viewer, then leaves it
    let qa = admin::create_group(pool, division.id, "qa").await?;
    admin::assign_role_to_group(pool, division.id, qa.id, viewer.id).await?;
    admin::add_user_to_group(pool, division.id, qa.id, user.id).await?;

    let grant = admin::add_namespace_grant(
        pool,
        division.id,
        user.id,
        &NamespaceGrantRequest {
            role_id: viewer.id,
            namespace: "/2k/*".to_string(),
        },
    )
    .await?;

    let resolver = NamespaceResolver::new(store(pool));
    let dana = Principal::new("dana@2k.com");

    admin::remove_user_from_group(pool, division.id, qa.id, user.id).await?;
    assert!(resolver.can_read_namespace(&dana, "/2k/games/nba").await?);

    // Deleting the grant row is what revokes it
    admin::remove_namespace_grant(pool, division.id, user.id, grant.id).await?;
    assert!(!resolver.can_read_namespace(&dana, "/2k/games/nba").await?);

    // So does deleting the role, by cascade
    admin::add_namespace_grant(
        pool,
        division.id,
        user.id,
        &NamespaceGrantRequest {
            role_id: viewer.id,
            namespace: "/2k/*".to_string(),
        },
    )
    .await?;
    assert!(resolver.can_read_namespace(&dana, "/2k/games/nba").await?);
    admin::delete_role(pool, division.id, viewer.id).await?;
    assert!(!resolver.can_read_namespace(&dana, "/2k/games/nba").await?);

    Ok(())
}

#[tokio::test]
async fn namespace_errors_are_not_denials() -> Result<()> {
    let db = setup_db().await?;
    let resolver = NamespaceResolver::new(store(&db.pool));

    let missing = resolver
        .can_read_namespace(&Principal::new("ghost@example.com"), "/2k")
        .await;
    assert!(matches!(missing, Err(AuthzError::PrincipalNotFound(_))));

    let relative = resolver
        .can_read_namespace(&Principal::new("ghost@example.com"), "2k/games")
        .await;
    assert!(matches!(relative, Err(AuthzError::InvalidRequest(_))));

    Ok(())
}

#[tokio::test]
async fn routing_resolver_keeps_models_apart() -> Result<()> {
    let db = setup_db().await?;
    let pool = &db.pool;
    let division = admin::create_division(pool, "2K").await?;
    let user = add_user(pool, division.id, "eve@2k.com").await?;
    let role = add_role(pool, division.id, "viewer", &[Permission::Read], &[]).await?;
    admin::add_namespace_grant(
        pool,
        division.id,
        user.id,
        &NamespaceGrantRequest {
            role_id: role.id,
            namespace: "/*".to_string(),
        },
    )
    .await?;

    let resolver = RoutingResolver::new(store(pool));
    let eve = Principal::new("eve@2k.com");

    assert!(resolver.can_read_namespace(&eve, "/anything/at/all").await?);

    // A namespace grant says nothing about games: no role has a game set
    let game = admin::create_game(pool, division.id, "BioShock").await?;
    let decision = resolver
        .resolve(
            &eve,
            &AccessRequest::Resource {
                game_id: game.id,
                permissions: vec![Permission::Read],
            },
        )
        .await?;
    assert!(!decision.is_allowed());

    Ok(())
}

#[tokio::test]
async fn malformed_grant_patterns_are_rejected() -> Result<()> {
    let db = setup_db().await?;
    let pool = &db.pool;
    let division = admin::create_division(pool, "2K").await?;
    let user = add_user(pool, division.id, "finn@2k.com").await?;
    let role = add_role(pool, division.id, "viewer", &[Permission::Read], &[]).await?;

    for namespace in ["2k/*", "/2k//games", "/2k/*/games"] {
        let result = admin::add_namespace_grant(
            pool,
            division.id,
            user.id,
            &NamespaceGrantRequest {
                role_id: role.id,
                namespace: namespace.to_string(),
            },
        )
        .await;
        assert!(
            matches!(result, Err(AppError::BadRequest(_))),
            "{namespace} should be rejected"
        );
    }

    Ok(())
}
