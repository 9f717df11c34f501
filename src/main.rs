use std::process::ExitCode;

use techwriter::present::BannerShown;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = techwriter::logging::init();

    match techwriter::run().await {
        Ok(()) => ExitCode::SUCCESS,
        // Already on stderr as a banner.
        Err(err) if err.is::<BannerShown>() => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
