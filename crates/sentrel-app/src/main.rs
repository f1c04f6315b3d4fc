//! Binary entrypoint: delegates straight to [`sentrel_app::run`].

use sentrel_app::AppResult;

#[tokio::main]
async fn main() -> AppResult<()> {
    sentrel_app::run().await
}
