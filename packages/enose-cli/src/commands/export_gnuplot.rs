// Gnuplot export of the backend session
//
// The session is replayed through a telemetry buffer set so the exported
// table matches what the monitor would have shown. Records carry a
// millisecond `ts`; it becomes the time axis.

use crate::cli::ExportGnuplotArgs;
use crate::commands::{backend_client, fail, load_config};
use crate::exit_codes;
use enose_rs::buffer_set::{BufferSet, TimeAxis};
use enose_rs::export;
use enose_rs::surface::SurfaceLayout;

pub async fn execute(api_url: Option<&str>, args: ExportGnuplotArgs) -> i32 {
    let config = match load_config(api_url) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let backend = match backend_client(&config) {
        Ok(backend) => backend,
        Err(code) => return code,
    };

    let records = match backend.session_data().await {
        Ok(records) => records,
        Err(e) => return fail(e),
    };

    let layout = SurfaceLayout::telemetry_with_capacity(records.len().max(1));
    let mut buffers = BufferSet::new(layout.keys(), layout.capacity, TimeAxis::SessionRelative);
    for record in records {
        let timestamp = record.ts as f64 / 1000.0;
        buffers.append_sample(&record.into_sample(timestamp));
    }

    match export::write_gnuplot(&args.base, &buffers.snapshot(), &layout) {
        Ok(files) => {
            println!("Saved:\n{}\n{}", files.data.display(), files.script.display());
            exit_codes::SUCCESS
        }
        Err(e) => fail(e),
    }
}
