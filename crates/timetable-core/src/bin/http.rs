#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use class_timetable::{ServiceConfig, SubjectCatalog, TimetableService, http_api, telemetry};

    telemetry::init_tracing("class_timetable=info");

    let config = ServiceConfig::from_env();
    let addr = config.socket_addr()?;
    let calendar = config.load_calendar()?;
    let store = config.open_store()?;
    let service = TimetableService::new(calendar, SubjectCatalog::default(), store);

    println!("timetable HTTP API listening on http://{addr}");
    let state = http_api::AppState::new(service).with_school_name(config.school_name.clone());
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
