use ::std::net::SocketAddr;
use common_types_contact::Constants;

#[tokio::main]
async fn main() -> Result<(), common_types_contact::E> {
    ::std::env::set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");

    tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .without_time()
            .init();

    let appstate = common_types_contact::State::make_state()?;
    let router = common_types_contact::Routes::router(appstate);

    if lambda_web::is_running_on_lambda() {
        return lambda_web::run_hyper_on_lambda(router).await;
    }

    // Local development, same router served by hyper directly
    let addr = SocketAddr::from(([127, 0, 0, 1], *Constants::LOCAL_PORT));
    tracing::info!("Not running on Lambda, listening on http://{addr}");
    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}
