use actix_files::NamedFile;
use actix_web::{get, web::{Data, Path}};

use crate::{config::Config, error::AppError};

const STYLESHEETS: [&str; 2] = ["layout", "theme"];

#[get("/{sheet}.css")]
pub async fn stylesheet(config: Data<Config>, sheet: Path<String>) -> Result<NamedFile, AppError> {
    if !STYLESHEETS.contains(&sheet.as_str()) {
        return Err(AppError::NotFound);
    }
    Ok(NamedFile::open(config.assets_path.join(format!("{sheet}.css")))?)
}
