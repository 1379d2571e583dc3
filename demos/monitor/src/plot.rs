//! Plots samples through a `gnuplot -persistent` pipe.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use miband_link::telemetry::HeartRateSample;

/// Open a persistent gnuplot window with `samples`.
pub fn plot(samples: &[HeartRateSample]) -> io::Result<()> {
    if samples.is_empty() {
        return Ok(());
    }
    let mut child = Command::new("gnuplot")
        .arg("-persistent")
        .stdin(Stdio::piped())
        .spawn()?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("gnuplot stdin unavailable"))?;
    write_script(&mut stdin, samples)?;
    drop(stdin);
    child.wait()?;
    Ok(())
}

/// Line plus points, both fed inline.
pub fn write_script(out: &mut impl Write, samples: &[HeartRateSample]) -> io::Result<()> {
    writeln!(out, "set title 'Heart Rate vs. Time'")?;
    writeln!(out, "set xlabel 'Time (s)'")?;
    writeln!(out, "set ylabel 'Heart Rate (bpm)'")?;
    writeln!(
        out,
        "plot '-' with linespoints linetype 1 linecolor 'blue', '' with points pointtype 6 lc rgb 'red'"
    )?;
    for _ in 0..2 {
        for sample in samples {
            writeln!(out, "{} {}", sample.timestamp_secs, sample.bpm)?;
        }
        writeln!(out, "e")?;
    }
    out.flush()
}
