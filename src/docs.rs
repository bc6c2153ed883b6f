use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{authz, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::me,
		routes::catalog::list_permissions,
		routes::namespaces::check,
		routes::rbac::delete_division,
		routes::rbac::list_groups,
		routes::rbac::create_group,
		routes::rbac::delete_group,
		routes::rbac::list_members,
		routes::rbac::add_member,
		routes::rbac::remove_member,
		routes::rbac::assign_role,
		routes::rbac::unassign_role,
		routes::rbac::list_roles,
		routes::rbac::create_role,
		routes::rbac::delete_role,
		routes::rbac::get_role_grants,
		routes::rbac::set_role_grants,
		routes::rbac::grant_permission,
		routes::rbac::revoke_permission,
		routes::rbac::assign_game,
		routes::rbac::unassign_game,
		routes::rbac::list_namespace_grants,
		routes::rbac::add_namespace_grant,
		routes::rbac::remove_namespace_grant,
		routes::accounts::list_users,
		routes::accounts::create_user,
		routes::accounts::delete_user,
		routes::games::list_games,
		routes::games::create_game,
		routes::games::get_game,
		routes::games::update_game,
		routes::games::set_production,
		routes::games::delete_game
	),
	components(
		schemas(
			authz::Permission,
			authz::PermissionScope,
			authz::Catalog,
			authz::CatalogEntry,
			authz::Decision,
			authz::NamespaceAction,
			routes::health::HealthResponse,
			routes::namespaces::NamespaceCheckResponse,
			models::user::User,
			models::user::UserCreateRequest,
			models::rbac::Division,
			models::rbac::Group,
			models::rbac::GroupCreateRequest,
			models::rbac::Role,
			models::rbac::RoleCreateRequest,
			models::rbac::RoleGrants,
			models::rbac::Game,
			models::rbac::GameCreateRequest,
			models::rbac::GameUpdateRequest,
			models::rbac::ProductionUpdateRequest,
			models::rbac::MemberRequest,
			models::rbac::RoleAssignmentRequest,
			models::rbac::PermissionGrantRequest,
			models::rbac::GameAssignmentRequest,
			models::rbac::NamespaceGrant,
			models::rbac::NamespaceGrantRequest,
			models::access::RoleGrant,
			models::access::GroupAccess,
			models::access::AccessSummary
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Auth", description = "Caller identity and access"),
		(name = "Catalog", description = "Permission catalog"),
		(name = "RBAC", description = "Groups, roles and grants of a division"),
		(name = "Accounts", description = "Users of a division"),
		(name = "Games", description = "Games and game-scoped operations"),
		(name = "Namespaces", description = "Legacy namespace checks")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(&ApiDoc::openapi())?;

	normalize_path_operations(&mut doc);
	ensure_security_components(&mut doc)?;
	ensure_global_security(&mut doc)?;
	add_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn normalize_path_operations(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		let snapshot = paths.clone();
		for (path, item) in snapshot {
			if let Some(ops) = item.as_object() {
				let mut normalized = Map::new();
				for (method, val) in ops {
					let key = method.to_lowercase();
					if let Some(existing) = normalized.get_mut(&key) {
						merge_values(existing, val);
					} else {
						normalized.insert(key, val.clone());
					}
				}
				paths.insert(path, Value::Object(normalized));
			}
		}
	}
}

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = root_object(doc)?
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?;

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("securitySchemes must be an object"))?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT",
			"description": "HS256 token whose `sub` is the caller's external id"
		}),
	);
	Ok(())
}

fn ensure_global_security(doc: &mut Value) -> anyhow::Result<()> {
	root_object(doc)?
		.entry("security")
		.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	Ok(())
}

fn add_examples(doc: &mut Value) {
	if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
		for item in paths.values_mut() {
			if let Some(operations) = item.as_object_mut() {
				for operation in operations.values_mut() {
					apply_request_examples(operation);
				}
			}
		}
	}
}

fn apply_request_examples(operation: &mut Value) {
	let Some(request_body) = operation.get_mut("requestBody") else { return; };
	let Some(content) = request_body.get_mut("content").and_then(Value::as_object_mut) else { return; };
	let Some(app_json) = content.get_mut("application/json").and_then(Value::as_object_mut) else { return; };
	let Some(schema) = app_json.get("schema").and_then(Value::as_object) else { return; };
	let Some(reference) = schema.get("$ref").and_then(Value::as_str) else { return; };

	let example = match reference {
		"#/components/schemas/RoleGrants" => Some(json!({
			"permissions": ["read", "update", "delete"],
			"game_ids": [1]
		})),
		"#/components/schemas/NamespaceGrantRequest" => Some(json!({
			"role_id": 1,
			"namespace": "/firaxis/games/*"
		})),
		"#/components/schemas/UserCreateRequest" => Some(json!({
			"external_id": "ada@example.com",
			"name": "Ada Lovelace"
		})),
		"#/components/schemas/ProductionUpdateRequest" => Some(json!({
			"in_production": true
		})),
		_ => None,
	};

	if let Some(example) = example {
		app_json.insert("example".to_string(), example);
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

fn merge_values(target: &mut Value, addition: &Value) {
	match (target, addition) {
		(Value::Object(dest), Value::Object(src)) => {
			for (key, value) in src {
				if let Some(existing) = dest.get_mut(key) {
					merge_values(existing, value);
				} else {
					dest.insert(key.clone(), value.clone());
				}
			}
		}
		(Value::Array(dest), Value::Array(src)) => {
			for item in src {
				if !dest.contains(item) {
					dest.push(item.clone());
				}
			}
		}
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_values_unions_arrays() {
		let mut a = json!({"tags": ["RBAC"], "x": {"y": 1}});
		merge_values(&mut a, &json!({"tags": ["RBAC", "Games"], "x": {"z": 2}}));
		assert_eq!(a, json!({"tags": ["RBAC", "Games"], "x": {"y": 1, "z": 2}}));
	}
}
