// lib.rs
use poem::{
    Endpoint, EndpointExt, Route,
    middleware::{Cors, NormalizePath, Tracing, TrailingSlash},
};
use poem_openapi::OpenApiService;

pub mod api;
pub mod config;
pub mod entities;
pub mod migration;
pub mod store;

pub use api::Api;
pub use config::Config;
pub use store::{Store, StoreError};

/// Builds the HTTP application around an already-migrated store.
pub fn app(store: Store) -> impl Endpoint {
    let api = OpenApiService::new(Api::new(store), "Blog API", "1.0");
    let ui = api.swagger_ui();

    Route::new()
        .nest("/docs", ui)
        .nest("/", api)
        .with(Cors::new())
        .with(Tracing)
        // the seed forms are posted to `/adduser/` and `/addposst/`
        .with(NormalizePath::new(TrailingSlash::Trim))
}
