// CLI command implementations
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;

use mp3meta::{AudioContext, DecodeOptions};

use crate::cli::output::{OutputFormatter, ProgressBar};

/// Condensed view of a decode pass for display
pub fn summarize(path: &str, context: &AudioContext, include_frames: bool) -> Result<Value> {
    let tag = context.tag.as_ref().map(|tag| {
        let mut frames = Map::new();
        for frame in &tag.text_frames {
            let key = if frame.header.is_user_text() {
                format!("{}:{}", frame.header.id, frame.description)
            } else {
                frame.header.id.clone()
            };
            frames.entry(key).or_insert_with(|| Value::String(frame.value.clone()));
        }
        json!({
            "version": tag.header.version_string(),
            "size": tag.header.size,
            "frames": frames,
            "other_frames": tag.other_frames.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            "padding": tag.padding,
        })
    });

    let audio = context.first_frame().map(|first| {
        json!({
            "first_frame_offset": first.offset,
            "version": first.header.version.as_str(),
            "layer": first.header.layer.number(),
            "bitrate": first.header.bitrate,
            "sample_rate": first.header.sample_rate,
            "channel_mode": first.header.channel_mode,
            "frame_count": context.frames.len(),
        })
    });

    let mut summary = json!({
        "file": path,
        "tag": tag,
        "audio": audio,
        "vbr": serde_json::to_value(&context.vbr)?,
        "duration_secs": context.duration_secs(),
        "average_bitrate": context.average_bitrate(),
        "diagnostics": context.diagnostics,
    });

    if include_frames {
        summary["frames"] = serde_json::to_value(&context.frames)?;
    }
    Ok(summary)
}

/// Read metadata from files
pub fn command_read(
    files: &[String],
    include_frames: bool,
    output: Option<&str>,
    options: &DecodeOptions,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };

    for file_path in files {
        match mp3meta::read_file_with(file_path, options) {
            Ok(context) => {
                let summary = summarize(file_path, &context, include_frames)?;
                formatter.output_metadata(&summary, &mut *writer)?;
            }
            Err(e) => formatter.print_error(&format!("{}: {}", file_path, e)),
        }
    }

    writer.flush()?;
    Ok(())
}

/// One-line description of what a decode pass found
pub fn describe(context: &AudioContext) -> String {
    let tag = match &context.tag {
        Some(tag) => format!("ID3v{}", tag.header.version_string()),
        None => "no ID3v2".to_string(),
    };
    let audio = match context.first_frame() {
        Some(first) => format!(
            "MPEG {} Layer {} at {}",
            first.header.version,
            first.header.layer.number(),
            first.offset
        ),
        None => "no audio frames".to_string(),
    };
    let vbr = match &context.vbr {
        Some(vbr) => format!("{:?} header", vbr.id),
        None => "no VBR header".to_string(),
    };
    format!("{} | {} | {}", tag, audio, vbr)
}

/// Detect tag version, first frame and VBR header
pub fn command_detect(files: &[String], options: &DecodeOptions, formatter: &OutputFormatter) -> Result<()> {
    for file_path in files {
        match mp3meta::read_file_with(file_path, options) {
            Ok(context) => println!("{}: {}", file_path, describe(&context)),
            Err(e) => formatter.print_error(&format!("{}: {}", file_path, e)),
        }
    }
    Ok(())
}

/// Decode every file under `directory` matching `pattern`
pub fn command_batch(
    directory: &str,
    pattern: &str,
    options: &DecodeOptions,
    formatter: &OutputFormatter,
) -> Result<()> {
    // Build glob pattern
    let glob_pattern = if pattern.contains('*') || pattern.contains('?') {
        format!("{}/{}", directory, pattern)
    } else {
        format!("{}/**/{}", directory, pattern)
    };
    debug!(pattern = %glob_pattern, "batch glob");

    let mut files = Vec::new();
    for entry in glob::glob(&glob_pattern).context("invalid glob pattern")? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => formatter.print_error(&format!("Error reading path: {}", e)),
        }
    }

    let total = files.len();
    if total == 0 {
        formatter.print_info("No files found matching pattern");
        return Ok(());
    }
    formatter.print_info(&format!("Processing {} files...", total));

    let mut progress = ProgressBar::new(total, !formatter.quiet);
    let mut success_count = 0;
    let mut error_count = 0;
    let mut failures = Vec::new();

    for path in &files {
        let label = path.display().to_string();
        match mp3meta::read_file_with(path, options) {
            Ok(context) if context.frames.is_empty() => {
                error_count += 1;
                failures.push(format!("{}: no MPEG audio frames", label));
            }
            Ok(_) => success_count += 1,
            Err(e) => {
                error_count += 1;
                failures.push(format!("{}: {}", label, e));
            }
        }
        progress.increment(&label);
    }

    for failure in &failures {
        formatter.print_error(failure);
    }
    formatter.print_success(&format!("Completed: {} successful, {} errors", success_count, error_count));
    Ok(())
}

/// File size, modification time and playback details
pub fn file_info(path: &Path, context: &AudioContext) -> Result<Value> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .ok()
        .map(|mtime| DateTime::<Utc>::from(mtime).format("%Y-%m-%d %H:%M:%S UTC").to_string());

    Ok(json!({
        "file": path.display().to_string(),
        "size": metadata.len(),
        "modified": modified,
        "duration_secs": context.duration_secs(),
        "average_bitrate": context.average_bitrate(),
        "vbr": context.vbr.as_ref().map(|v| v.is_vbr()),
    }))
}

/// Show file information
pub fn command_info(files: &[String], options: &DecodeOptions, formatter: &OutputFormatter) -> Result<()> {
    let mut stdout = std::io::stdout();
    for file_path in files {
        let path = Path::new(file_path);
        match mp3meta::read_file_with(path, options) {
            Ok(context) => {
                let info = file_info(path, &context)?;
                formatter.output_metadata(&info, &mut stdout)?;
            }
            Err(e) => formatter.print_error(&format!("{}: {}", file_path, e)),
        }
    }
    Ok(())
}
