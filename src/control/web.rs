use crate::control::SharedFollower;
use crate::util::lamp_api::Lamp;
use crate::util::secrets;
use axum::{extract::State, http::StatusCode as Code, Json};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

type Response<T> = Result<T, (Code, &'static str)>;

/// require basic authorization with password equal to sha256 of the configured api key (case insensitive)
fn authorize(auth: &Authorization<Basic>) -> Response<()> {
    if !auth.0.password().eq_ignore_ascii_case(sha256::digest(secrets::api_key()).as_str()) {
        return Err((Code::UNAUTHORIZED, "password in basic authorization header is incorrect. expected sha256 of the api key (case insensitive)."));
    }
    Ok(())
}

/// lamp color and pattern names go straight into a request path
fn validate_name(name: &str) -> Response<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err((Code::UNPROCESSABLE_ENTITY, "name must be non-empty and ascii-alphanumeric"));
    }
    Ok(())
}

#[derive(Debug, serde::Serialize, ToSchema)]
struct FollowerStatus {
    enabled: bool,
    /// manual brightness in percent, the follower's max while enabled
    #[schema(minimum = 0, maximum = 100)]
    brightness: u8,
}

#[utoipa::path(
    get,
    path = "/follower",
    responses((
        status = 200,
        description = "Get current follower mode and manual brightness.",
        body = FollowerStatus
    )),
    security(("authorization" = [])) // require auth
)]
async fn get_follower(
    TypedHeader(auth): TypedHeader<Authorization<Basic>>,
    State(follower): State<SharedFollower>,
) -> Response<Json<FollowerStatus>> {
    authorize(&auth)?;
    Ok(Json(FollowerStatus {
        enabled: follower.enabled().await,
        brightness: follower.manual_brightness(),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
struct FollowerMode {
    enabled: bool,
}

#[utoipa::path(
    put,
    path = "/follower",
    request_body = FollowerMode,
    responses((
        status = 200,
        description = "Enable or disable follower mode. A request matching the current mode is ignored. Return response message."
    )),
    security(("authorization" = [])) // require auth
)]
async fn put_follower(
    TypedHeader(auth): TypedHeader<Authorization<Basic>>,
    State(follower): State<SharedFollower>,
    Json(mode): Json<FollowerMode>,
) -> Response<&'static str> {
    authorize(&auth)?;
    if mode.enabled {
        follower.enable().await;
        Ok("follower enabled")
    } else {
        follower.disable().await;
        Ok("follower disabled")
    }
}

#[derive(Debug, Deserialize, ToSchema)]
struct BrightnessState {
    /// manual brightness in percent
    #[schema(minimum = 0, maximum = 100)]
    brightness: u8,
}

#[utoipa::path(
    put,
    path = "/brightness",
    request_body = BrightnessState,
    responses((
        status = 200,
        description = "Set manual brightness and push it to the lamp. While the follower is enabled its next update overrides it again, with the new value as max brightness. Return response message."
    )),
    security(("authorization" = [])) // require auth
)]
async fn put_brightness(
    TypedHeader(auth): TypedHeader<Authorization<Basic>>,
    State(follower): State<SharedFollower>,
    Json(state): Json<BrightnessState>,
) -> Response<&'static str> {
    authorize(&auth)?;
    if state.brightness > 100 {
        return Err((Code::UNPROCESSABLE_ENTITY, "brightness must be from 0 to 100"));
    }
    follower.set_manual_brightness(state.brightness).await;
    Ok("brightness set")
}

#[derive(Debug, Deserialize, ToSchema)]
struct ColorState {
    /// color name the lamp understands, e.g. "red" or "off"
    name: String,
}

#[utoipa::path(
    put,
    path = "/color",
    request_body = ColorState,
    responses((
        status = 200,
        description = "Send a color command to the lamp. Return response message."
    )),
    security(("authorization" = [])) // require auth
)]
async fn put_color(
    TypedHeader(auth): TypedHeader<Authorization<Basic>>,
    State(follower): State<SharedFollower>,
    Json(state): Json<ColorState>,
) -> Response<&'static str> {
    authorize(&auth)?;
    validate_name(&state.name)?;
    match follower.lamp().set_color(&state.name).await {
        Ok(()) => Ok("color set"),
        Err(_) => Err((Code::BAD_GATEWAY, "lamp did not accept the color command")),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
struct PatternState {
    /// pattern name the lamp understands, e.g. "xmasfade"
    name: String,
}

#[utoipa::path(
    put,
    path = "/pattern",
    request_body = PatternState,
    responses((
        status = 200,
        description = "Send a pattern command to the lamp. Return response message."
    )),
    security(("authorization" = [])) // require auth
)]
async fn put_pattern(
    TypedHeader(auth): TypedHeader<Authorization<Basic>>,
    State(follower): State<SharedFollower>,
    Json(state): Json<PatternState>,
) -> Response<&'static str> {
    authorize(&auth)?;
    validate_name(&state.name)?;
    match follower.lamp().set_pattern(&state.name).await {
        Ok(()) => Ok("pattern started"),
        Err(_) => Err((Code::BAD_GATEWAY, "lamp did not accept the pattern command")),
    }
}

/// start webserver. never terminates.
pub async fn start_server(follower: SharedFollower) {
    use crate::constants::net::{LOCALHOST, PORT};
    use axum::response::Redirect;
    use axum::routing::{get, put};
    use utoipa::{
        openapi::security::{Http, HttpAuthScheme, SecurityScheme},
        OpenApi,
    };
    use utoipa_swagger_ui::SwaggerUi;

    /// utility struct for utoipa to register basic http authorization.
    /// this is necessary for showing an "Authorize" button in swagger-ui.
    struct AuthHint;
    impl utoipa::Modify for AuthHint {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme(
                    "authorization",
                    SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
                )
            }
        }
    }

    // set up utoipa swagger ui
    #[derive(OpenApi)]
    #[openapi(
        // use security scheme for basic http authorization
        modifiers(&AuthHint),
        paths(
            // functions with #[utoipa::path(...)]
            get_follower,
            put_follower,
            put_brightness,
            put_color,
            put_pattern
        ),
        components(schemas(
            // structs with #[derive(utoipa::ToSchema)]
            FollowerStatus,
            FollowerMode,
            BrightnessState,
            ColorState,
            PatternState
        )),
        tags((name = "lamp-follower", description = "API for the sun-following lamp controller"))
    )]
    struct ApiDoc;

    // configure routes
    let app = axum::Router::new()

        // swagger ui
        .merge(SwaggerUi::new("/swagger-ui")
            .url("/openapi.json", ApiDoc::openapi()))

        // temporarily redirect root to swagger ui
        .route("/", get(|| async { Redirect::temporary("/swagger-ui") }))

        // actual api
        .route("/follower", get(get_follower).put(put_follower))
        .route("/brightness", put(put_brightness))
        .route("/color", put(put_color))
        .route("/pattern", put(put_pattern))
        .with_state(Arc::clone(&follower));

    // start server
    let address = std::net::SocketAddr::new(LOCALHOST, PORT);
    println!("WEB: starting server on http://{address} ...");
    let listener = tokio::net::TcpListener::bind(address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
