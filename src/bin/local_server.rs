use road_marking_gateway::{
    error::{GatewayError, Result},
    init_logging, logerr, logln, server,
    util::config::Config,
    App,
};

const CC: &str = "LocalServer";

async fn launch() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config.logging)?;

    logln!(@CC, "Starting road marking gateway");

    let app = App::from_config(config).await?;

    server::build_rocket(app)
        .launch()
        .await
        .map_err(|err| GatewayError::Config(err.to_string()))?;

    logln!(@CC, "Server stopped");
    Ok(())
}

#[rocket::main]
async fn main() {
    if let Err(err) = launch().await {
        logerr!(@CC, "{}", err);
        std::process::exit(1);
    }
}
