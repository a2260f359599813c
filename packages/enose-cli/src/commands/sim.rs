use crate::cli::{SaveFormat, SimCommand, SimParamsArgs, SimRecordArgs};
use crate::commands::{backend_client, fail, load_config, parse_duration, with_backend};
use crate::exit_codes;
use enose_rs::backend::{SignalParams, SimParams};
use enose_rs::export;
use enose_rs::monitor::Monitor;
use enose_rs::surface::Surface;

pub async fn execute(api_url: Option<&str>, command: SimCommand) -> i32 {
    match command {
        SimCommand::Start => {
            with_backend(api_url, |backend| async move { backend.sim_start().await }).await
        }
        SimCommand::Stop => {
            with_backend(api_url, |backend| async move { backend.sim_stop().await }).await
        }
        SimCommand::Params(args) => {
            if let Err(e) = validate(&args) {
                eprintln!("Error: {}", e);
                return exit_codes::INPUT_ERROR;
            }
            let sim_params = params(&args);
            with_backend(api_url, |backend| async move {
                backend.sim_params(&sim_params).await
            })
            .await
        }
        SimCommand::Record(args) => record(api_url, args).await,
    }
}

fn params(args: &SimParamsArgs) -> SimParams {
    SimParams {
        signal1: SignalParams {
            amplitude: args.amp1,
            frequency: args.freq1,
            phase: args.phase1,
        },
        signal2: SignalParams {
            amplitude: args.amp2,
            frequency: args.freq2,
            phase: args.phase2,
        },
        operation: args.operation,
    }
}

fn validate(args: &SimParamsArgs) -> Result<(), String> {
    let values = [
        ("amp1", args.amp1),
        ("freq1", args.freq1),
        ("phase1", args.phase1),
        ("amp2", args.amp2),
        ("freq2", args.freq2),
        ("phase2", args.phase2),
    ];
    for (name, value) in values {
        if !value.is_finite() {
            return Err(format!("--{} must be a finite number", name));
        }
    }
    if args.freq1 < 0.0 || args.freq2 < 0.0 {
        return Err("Frequencies must not be negative".to_string());
    }
    Ok(())
}

/// Start the simulator, buffer its stream for a while, then save locally
async fn record(api_url: Option<&str>, args: SimRecordArgs) -> i32 {
    if args.duration <= 0.0 {
        eprintln!("Error: --duration must be greater than zero");
        return exit_codes::INPUT_ERROR;
    }
    let duration = match parse_duration(args.duration) {
        Ok(duration) => duration,
        Err(code) => return code,
    };

    let config = match load_config(api_url) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let backend = match backend_client(&config) {
        Ok(backend) => backend,
        Err(code) => return code,
    };

    let monitor = Monitor::new(config);
    if let Err(e) = monitor.start() {
        return fail(e);
    }

    if let Err(e) = monitor.start_simulation(&backend).await {
        monitor.stop().await;
        return fail(e);
    }

    tokio::time::sleep(duration).await;

    if let Err(e) = backend.sim_stop().await {
        log::warn!("Failed to stop simulator: {}", e);
    }
    monitor.stop().await;

    let snapshot = monitor.buffers(Surface::Simulation).snapshot();
    let saved = match args.format {
        SaveFormat::Csv => export::write_simulation_csv(&args.path, &snapshot),
        SaveFormat::Json => export::write_simulation_json(&args.path, &snapshot),
    };

    match saved {
        Ok(points) => {
            println!("Saved {} points to {}", points, args.path.display());
            exit_codes::SUCCESS
        }
        Err(e) => fail(e),
    }
}
