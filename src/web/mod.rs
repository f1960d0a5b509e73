// src/web/mod.rs
//! Token-exchange relay: `POST /api/github-token` with `{code}`.

pub mod relay;
pub mod types;

pub use relay::TokenRelay;
pub use types::*;

use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{
    catch, catchers, delete, get, options, patch, post, put, routes, Build, Request, Response,
    Rocket, State,
};
use tracing::{info, warn};

type RelayResult = Result<Json<TokenResponse>, (Status, Json<RelayErrorResponse>)>;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "POST, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
    }
}

#[post("/github-token", data = "<body>")]
pub async fn github_token(body: String, relay: &State<TokenRelay>) -> RelayResult {
    let request = if body.trim().is_empty() {
        TokenRequest { code: None }
    } else {
        serde_json::from_str::<TokenRequest>(&body).map_err(|e| {
            warn!("Rejected token request body: {}", e);
            (
                Status::BadRequest,
                Json(RelayErrorResponse::new(
                    "invalid_request",
                    "Request body must be a JSON object",
                )),
            )
        })?
    };

    relay
        .exchange(request.code.as_deref())
        .await
        .map(Json)
        .map_err(|(status, body)| (status, Json(body)))
}

fn method_not_allowed() -> (Status, Json<RelayErrorResponse>) {
    (
        Status::MethodNotAllowed,
        Json(RelayErrorResponse::new(
            "method_not_allowed",
            "Only POST method is allowed",
        )),
    )
}

#[get("/github-token")]
pub fn github_token_get() -> (Status, Json<RelayErrorResponse>) {
    method_not_allowed()
}

#[put("/github-token")]
pub fn github_token_put() -> (Status, Json<RelayErrorResponse>) {
    method_not_allowed()
}

#[patch("/github-token")]
pub fn github_token_patch() -> (Status, Json<RelayErrorResponse>) {
    method_not_allowed()
}

#[delete("/github-token")]
pub fn github_token_delete() -> (Status, Json<RelayErrorResponse>) {
    method_not_allowed()
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

#[get("/health")]
pub fn health() -> &'static str {
    "ok"
}

// Error catchers
#[catch(404)]
pub fn not_found() -> Json<RelayErrorResponse> {
    Json(RelayErrorResponse::new("not_found", "Unknown endpoint"))
}

#[catch(default)]
pub fn default_catcher(status: Status, _request: &Request) -> (Status, Json<RelayErrorResponse>) {
    (
        status,
        Json(RelayErrorResponse::new(
            "internal_error",
            format!("Request failed with status {}", status.code),
        )),
    )
}

fn assemble(rocket: Rocket<Build>, relay: TokenRelay) -> Rocket<Build> {
    rocket
        .attach(Cors)
        .manage(relay)
        .register("/", catchers![not_found, default_catcher])
        .mount(
            "/api",
            routes![
                github_token,
                github_token_get,
                github_token_put,
                github_token_patch,
                github_token_delete,
                options,
                health,
            ],
        )
}

pub fn build_rocket(relay: TokenRelay) -> Rocket<Build> {
    assemble(rocket::build(), relay)
}

pub async fn start_relay_server(relay: TokenRelay, port: u16) -> Result<()> {
    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", port));

    info!("Starting token relay on http://0.0.0.0:{}/api/github-token", port);

    assemble(rocket::custom(figment), relay)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Relay server failed: {}", e))?;
    Ok(())
}
