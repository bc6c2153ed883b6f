use axum::Json;

use crate::authz::Catalog;

/// The closed permission catalog with each permission's scope.
#[utoipa::path(
    get,
    path = "/permissions",
    tag = "Catalog",
    responses((status = 200, description = "Permission catalog", body = Catalog))
)]
pub async fn list_permissions() -> Json<Catalog> {
    Json(Catalog::current())
}
