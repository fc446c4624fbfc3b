mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use competition_toolkit::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
