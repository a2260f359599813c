// Local export of buffered data
//
// Gnuplot export writes a whitespace-separated table (`<base>.dat`) and a
// script that plots it (`<base>.gp`). The script references the table by
// file name only, so the pair can be moved together.

use crate::buffer_set::BufferSnapshot;
use crate::surface::SurfaceLayout;
use crate::types::{CollaboratorError, CollaboratorResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct GnuplotFiles {
    pub data: PathBuf,
    pub script: PathBuf,
}

/// Write `<base>.dat` and `<base>.gp` for a surface snapshot
///
/// Any extension on `base` is replaced. Refuses an empty snapshot.
pub fn write_gnuplot(
    base: &Path,
    snapshot: &BufferSnapshot,
    layout: &SurfaceLayout,
) -> CollaboratorResult<GnuplotFiles> {
    if snapshot.is_empty() {
        return Err(CollaboratorError::EmptySession);
    }

    let files = GnuplotFiles {
        data: base.with_extension("dat"),
        script: base.with_extension("gp"),
    };

    let mut data = BufWriter::new(File::create(&files.data)?);
    write_table(&mut data, snapshot, layout)?;
    data.flush()?;

    let data_name = file_name(&files.data);
    let title = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut script = BufWriter::new(File::create(&files.script)?);
    write_script(&mut script, &data_name, &title, layout)?;
    script.flush()?;

    log::info!(
        "Saved gnuplot files: {} {}",
        files.data.display(),
        files.script.display()
    );
    Ok(files)
}

fn write_table<W: Write>(
    out: &mut W,
    snapshot: &BufferSnapshot,
    layout: &SurfaceLayout,
) -> std::io::Result<()> {
    let headers: Vec<String> = std::iter::once("Time".to_string())
        .chain(layout.channels.iter().map(|c| c.short_label.replace(' ', "_")))
        .collect();
    writeln!(out, "# {}", headers.join(" "))?;

    let columns: Vec<&[f64]> = layout
        .channels
        .iter()
        .map(|c| column(snapshot, &c.key))
        .collect();

    for (i, time) in snapshot.times.iter().enumerate() {
        let mut row = format!("{:.4}", time);
        for column in &columns {
            let value = column.get(i).copied().unwrap_or(0.0);
            row.push_str(&format!(" {:.4}", value));
        }
        writeln!(out, "{}", row)?;
    }
    Ok(())
}

fn write_script<W: Write>(
    out: &mut W,
    data_name: &str,
    title: &str,
    layout: &SurfaceLayout,
) -> std::io::Result<()> {
    let plots: Vec<String> = layout
        .channels
        .iter()
        .enumerate()
        .map(|(i, c)| {
            // column 1 is time
            format!(
                "\"{}\" using 1:{} with lines title \"{}\" lc rgb \"{}\" lw 2",
                data_name,
                i + 2,
                c.short_label,
                c.color
            )
        })
        .collect();

    writeln!(out, "set title \"{}: {}\"", layout.title, title)?;
    writeln!(out, "set xlabel \"Time (s)\"")?;
    writeln!(out, "set ylabel \"Sensor Value\"")?;
    writeln!(out, "set grid")?;
    writeln!(out, "set key outside")?;
    writeln!(out, "set term wxt size 1000,600 persist")?;
    writeln!(out, "plot {}", plots.join(", \\\n     "))?;
    writeln!(out, "pause mouse close")?;
    Ok(())
}

fn column<'a>(snapshot: &'a BufferSnapshot, key: &str) -> &'a [f64] {
    snapshot
        .channel(key)
        .map(|c| c.values.as_slice())
        .unwrap_or(&[])
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One simulation point as exported
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub time: f64,
    pub signal1: f64,
    pub signal2: f64,
    pub result: f64,
}

impl SimulationRecord {
    /// Rows of a simulation surface snapshot, oldest first
    pub fn from_snapshot(snapshot: &BufferSnapshot) -> Vec<Self> {
        let (x1, x2, y) = (
            column(snapshot, "x1"),
            column(snapshot, "x2"),
            column(snapshot, "y"),
        );

        snapshot
            .times
            .iter()
            .enumerate()
            .map(|(i, &time)| Self {
                time,
                signal1: x1.get(i).copied().unwrap_or(0.0),
                signal2: x2.get(i).copied().unwrap_or(0.0),
                result: y.get(i).copied().unwrap_or(0.0),
            })
            .collect()
    }
}

/// Write simulation points as CSV. Returns the number of rows written.
pub fn write_simulation_csv(path: &Path, snapshot: &BufferSnapshot) -> CollaboratorResult<usize> {
    let records = SimulationRecord::from_snapshot(snapshot);

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Time", "Signal1", "Signal2", "Result"])?;
    for r in &records {
        writer.serialize((r.time, r.signal1, r.signal2, r.result))?;
    }
    writer.flush()?;

    log::info!("Saved {} points to {}", records.len(), path.display());
    Ok(records.len())
}

/// Write simulation points as a JSON array. Returns the number of points.
pub fn write_simulation_json(path: &Path, snapshot: &BufferSnapshot) -> CollaboratorResult<usize> {
    let records = SimulationRecord::from_snapshot(snapshot);

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;

    log::info!("Saved {} points to {}", records.len(), path.display());
    Ok(records.len())
}
