// One-shot backend control commands

use crate::cli::{ConnectArgs, PortsArgs, SaveArgs, SaveFormat, SessionArgs, StartArgs};
use crate::commands::{backend_client, fail, load_config, with_backend};
use crate::exit_codes;
use crate::output;
use serde::Serialize;

#[derive(Serialize)]
struct PortsOutput {
    ports: Vec<String>,
}

pub async fn ports(api_url: Option<&str>, args: PortsArgs) -> i32 {
    let config = match load_config(api_url) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let backend = match backend_client(&config) {
        Ok(backend) => backend,
        Err(code) => return code,
    };

    let ports = match backend.list_serial_ports().await {
        Ok(ports) => ports,
        Err(e) => return fail(e),
    };

    if args.json {
        return output::emit_json(&PortsOutput { ports }, false, None);
    }
    if ports.is_empty() {
        println!("No serial ports found");
    } else {
        for port in ports {
            println!("{}", port);
        }
    }
    exit_codes::SUCCESS
}

pub async fn connect(api_url: Option<&str>, args: ConnectArgs) -> i32 {
    with_backend(api_url, |backend| async move {
        backend.connect_serial(&args.port).await
    })
    .await
}

pub async fn start(api_url: Option<&str>, args: StartArgs) -> i32 {
    with_backend(api_url, |backend| async move {
        let sample_id = backend.start_sampling(&args.label).await?;
        Ok(format!("Started sampling: {}", sample_id))
    })
    .await
}

pub async fn stop(api_url: Option<&str>) -> i32 {
    with_backend(api_url, |backend| async move { backend.stop_sampling().await }).await
}

pub async fn reset(api_url: Option<&str>) -> i32 {
    with_backend(api_url, |backend| async move { backend.reset().await }).await
}

pub async fn save(api_url: Option<&str>, args: SaveArgs) -> i32 {
    with_backend(api_url, |backend| async move {
        match args.format {
            SaveFormat::Csv => backend.save_csv(&args.path).await,
            SaveFormat::Json => backend.save_json(&args.path).await,
        }
    })
    .await
}

pub async fn influx(api_url: Option<&str>) -> i32 {
    with_backend(api_url, |backend| async move { backend.connect_influx().await }).await
}

pub async fn session(api_url: Option<&str>, args: SessionArgs) -> i32 {
    let config = match load_config(api_url) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let backend = match backend_client(&config) {
        Ok(backend) => backend,
        Err(code) => return code,
    };

    match backend.session_data().await {
        Ok(records) => output::emit_json(&records, args.compact, args.output.as_deref()),
        Err(e) => fail(e),
    }
}
