// Live stream monitor
//
// Runs the three subscriptions and, on every render tick, prints new backend
// log lines and one summary line per channel of the selected surface.

use crate::cli::MonitorArgs;
use crate::commands::{fail, load_config, parse_duration};
use crate::exit_codes;
use enose_rs::display::{DisplayFrame, DisplayParams};
use enose_rs::export;
use enose_rs::monitor::Monitor;
use enose_rs::surface::Surface;
use std::time::Duration;

pub async fn execute(api_url: Option<&str>, args: MonitorArgs) -> i32 {
    if let Err(e) = validate(&args) {
        eprintln!("Error: {}", e);
        return exit_codes::INPUT_ERROR;
    }
    let duration = match args.duration.map(parse_duration).transpose() {
        Ok(duration) => duration,
        Err(code) => return code,
    };

    let config = match load_config(api_url) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let surface = Surface::from(args.surface);
    let monitor = Monitor::new(config);

    if let Some(gain) = args.gain {
        if let Err(e) = monitor.set_gain(surface, gain) {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    }
    if let Some(spacing) = args.spacing {
        if let Err(e) = monitor.set_spacing(surface, spacing) {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    }

    let deadline = match duration {
        Some(duration) => match tokio::time::Instant::now().checked_add(duration) {
            Some(deadline) => Some(deadline),
            None => {
                eprintln!("Error: --duration is too long");
                return exit_codes::INPUT_ERROR;
            }
        },
        None => None,
    };

    if let Err(e) = monitor.start() {
        return fail(e);
    }
    log::info!("Monitoring {} (Ctrl-C to stop)", surface);

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Interrupted");
                break;
            }
            _ = sleep_until(deadline) => break,
            _ = ticker.tick() => render(&monitor, surface, args.auto_space),
        }
    }

    monitor.stop().await;
    render(&monitor, surface, false);

    if let Some(base) = args.gnuplot {
        let snapshot = monitor.buffers(surface).snapshot();
        match export::write_gnuplot(&base, &snapshot, monitor.layout(surface)) {
            Ok(files) => println!(
                "Saved: {} {} (run with: gnuplot {})",
                files.data.display(),
                files.script.display(),
                files
                    .script
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ),
            Err(e) => return fail(e),
        }
    }

    exit_codes::SUCCESS
}

fn validate(args: &MonitorArgs) -> Result<(), String> {
    if args.interval_ms == 0 {
        return Err("--interval-ms must be greater than zero".to_string());
    }
    Ok(())
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn render(monitor: &Monitor, surface: Surface, auto_space: bool) {
    for line in monitor.drain_log_lines() {
        println!("{}", line);
    }

    if auto_space {
        monitor.auto_space(surface);
    }

    let states: Vec<String> = monitor
        .connection_states()
        .iter()
        .map(|(kind, state)| format!("{}={}", kind, state))
        .collect();
    let frame = monitor.frame(surface);
    let samples = frame.series.first().map(|s| s.points.len()).unwrap_or(0);

    println!(
        "{} | {} | samples={}",
        monitor.status_line(),
        states.join(" "),
        samples
    );
    print_channels(monitor, surface, &frame, monitor.params(surface));
}

fn print_channels(monitor: &Monitor, surface: Surface, frame: &DisplayFrame, params: DisplayParams) {
    let layout = monitor.layout(surface);
    for series in &frame.series {
        let Some(&(time, display)) = series.points.last() else {
            continue;
        };
        let label = layout
            .channel(&series.key)
            .map(|c| c.label.as_str())
            .unwrap_or(series.key.as_str());
        let raw = (display - series.offset) / params.gain + series.baseline;
        println!(
            "  {:<16} t={:>9.3}  raw={:>12.4}  display={:>12.4}",
            label, time, raw, display
        );
    }
}
