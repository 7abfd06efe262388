use std::{sync::Mutex, io};
use actix_web::{web::{self, Data}, App, HttpServer, Responder, ResponseError, Either, HttpResponse, middleware::Logger, http::Method};
use envconfig::Envconfig;
use tracing_subscriber::EnvFilter;

use auth::Auth;
use config::Config;
use db::{DB, store::Store};
use error::AppError;

mod auth;
mod config;
mod data;
mod db;
mod error;
mod flash;
mod guard;
mod render;
mod routes;

async fn default_handler(req: Method) -> impl Responder {
    match req {
        Method::GET => Either::Left(AppError::NotFound.error_response()),
        _ => Either::Right(HttpResponse::MethodNotAllowed().finish()),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::init_from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let db = DB::load(Store::new(&config.store_path))?;
    let auth = Data::new(Mutex::new(Auth::init(config.session_max_age())));
    let db = Data::new(Mutex::new(db));

    let (host, port) = config.bind();
    let bind = (host.to_string(), port);
    tracing::info!(host = %bind.0, port = bind.1, status = ?config.database_status, "starting server");
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .configure(routes::configure)
            .app_data(auth.clone())
            .app_data(db.clone())
            .app_data(config.clone())
            .wrap(Logger::default())
            .default_service(web::to(default_handler))
    })
    .bind(bind)?
    .run()
    .await
}
