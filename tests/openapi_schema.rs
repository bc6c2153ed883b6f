use serde_json::Value;

#[test]
fn openapi_documents_guarded_routes() -> anyhow::Result<()> {
    let doc = publisher_api::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;

    let paths = v
        .get("paths")
        .and_then(Value::as_object)
        .expect("paths must exist");

    for p in [
        "/me",
        "/permissions",
        "/namespaces/check",
        "/games/{id}",
        "/games/{id}/production",
        "/divisions/{division_id}/roles/{role_id}/grants",
        "/divisions/{division_id}/users/{user_id}/namespace-grants",
    ] {
        assert!(paths.contains_key(p), "OpenAPI missing path '{}'", p);
    }

    let grants = paths["/divisions/{division_id}/roles/{role_id}/grants"]
        .as_object()
        .expect("grants path item");
    assert!(grants.contains_key("get") && grants.contains_key("put"));

    Ok(())
}

#[test]
fn openapi_role_grants_schema_and_bearer_scheme() -> anyhow::Result<()> {
    let doc = publisher_api::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;

    let props = v
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(|s| s.get("RoleGrants"))
        .and_then(|t| t.get("properties"))
        .and_then(Value::as_object)
        .expect("components.schemas.RoleGrants.properties must exist");
    assert!(props.contains_key("permissions"));
    assert!(props.contains_key("game_ids"));

    let scheme = v
        .pointer("/components/securitySchemes/bearerAuth/scheme")
        .and_then(Value::as_str);
    assert_eq!(scheme, Some("bearer"));

    let servers = v.get("servers").and_then(Value::as_array).expect("servers");
    assert!(servers.iter().any(|s| s["url"] == "http://localhost:8000"));

    Ok(())
}
