//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Courier API",
        version = "0.1.0",
        description = "Relay that saves Telegram messages to Notion. The direct upload endpoints accept multipart content authenticated with the X-Signature header and write it to Notion in chunks."
    ),
    paths(
        handlers::direct_upload::upload_page,
        handlers::direct_upload::upload_block,
        handlers::health::health_check,
        handlers::webhook_status::webhook_status,
    ),
    components(schemas(
        handlers::direct_upload::UploadResponse,
        handlers::health::HealthResponse,
        handlers::webhook_status::WebhookStatusResponse,
        ErrorResponse,
    )),
    tags(
        (name = "upload", description = "Direct uploads to Notion"),
        (name = "health", description = "Service health and webhook state")
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
