use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};

use comfy_table::{Cell, ContentArrangement, Table, presets::NOTHING};

use drolog::analysis::delay::{has_leading_delay, length_mismatch, total_delay};
use drolog::analysis::{CancelToken, LoopAnalyzer, RegisterStateTracker};
use drolog::dro::convert::convert_v2_to_v1;
use drolog::{FormatVersion, Song};

/// Read a DRO file, or stdin when the path is `-`.
pub(crate) fn read_dro_as_vec(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn parse(path: &Path, bytes: &[u8]) -> Result<Song> {
    let mut song = Song::try_from(bytes)
        .with_context(|| format!("failed to parse {} as a DRO file", path.display()))?;
    song.name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(song)
}

/// Produce a stable set of key/value summary fields for a song.
fn summarize_song(song: &Song) -> Vec<(String, String)> {
    let format = match song.format {
        FormatVersion::V1 => "v1",
        FormatVersion::V2 => "v2",
    };
    let calculated = total_delay(song);
    let mut rows: Vec<(String, String)> = vec![
        ("name".into(), song.name.clone()),
        ("format".into(), format.into()),
        ("hardware".into(), song.hardware.to_string()),
        ("instructions".into(), song.len().to_string()),
        ("declared_length".into(), format!("{} ms", song.ms_length)),
        ("calculated_delay".into(), format!("{} ms", calculated)),
        (
            "length_mismatch".into(),
            if length_mismatch(song) { "yes".into() } else { "no".into() },
        ),
        (
            "leading_delay".into(),
            if has_leading_delay(song) { "yes".into() } else { "no".into() },
        ),
        ("body_bytes".into(), song.stream.raw().len().to_string()),
    ];
    if song.format == FormatVersion::V2 {
        rows.push(("codemap_entries".into(), song.stream.codemap().len().to_string()));
        rows.push((
            "delay_codes".into(),
            format!(
                "short=0x{:02X} long=0x{:02X}",
                song.stream.short_delay_code(),
                song.stream.long_delay_code()
            ),
        ));
    }
    rows
}

pub(crate) fn info(path: &Path, bytes: Vec<u8>) -> Result<()> {
    let song = parse(path, &bytes)?;
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Field"), Cell::new("Value")]);
    for (k, v) in summarize_song(&song) {
        table.add_row(vec![Cell::new(k), Cell::new(v)]);
    }
    println!("{table}");
    Ok(())
}

pub(crate) fn dump(path: &Path, bytes: Vec<u8>, start: usize, count: usize) -> Result<()> {
    let song = parse(path, &bytes)?;
    let end = song.len().min(start.saturating_add(count));
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Index"),
        Cell::new("Offset"),
        Cell::new("Reg"),
        Cell::new("Value"),
        Cell::new("Description"),
    ]);
    for i in start..end {
        table.add_row(vec![
            Cell::new(i.to_string()),
            Cell::new(format!("0x{:06X}", song.stream.translate(i)?)),
            Cell::new(song.register_display(i)?),
            Cell::new(song.value_display(i)?),
            Cell::new(song.instruction_description(i)?),
        ]);
    }
    println!("{table}");
    if end < song.len() {
        println!("... {} more instruction(s)", song.len() - end);
    }
    Ok(())
}

pub(crate) fn analyze(path: &Path, bytes: Vec<u8>) -> Result<()> {
    let song = parse(path, &bytes)?;
    let analyzer = LoopAnalyzer::new();
    for (i, report) in analyzer.analyze(&song).iter().enumerate() {
        println!("=== Analysis {}/{}: {}", i + 1, analyzer.num_analyses(), report.title);
        println!();
        println!("{}", report.text);
    }
    Ok(())
}

pub(crate) fn registers(path: &Path, bytes: Vec<u8>, limit: usize) -> Result<()> {
    let song = parse(path, &bytes)?;
    let mut tracker = RegisterStateTracker::new();
    let descriptions = tracker.analyze(&song, &CancelToken::new());
    let shown = if limit == 0 {
        descriptions.len()
    } else {
        descriptions.len().min(limit)
    };
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Index"),
        Cell::new("Bank"),
        Cell::new("State change"),
    ]);
    for (i, (bank, description)) in descriptions.iter().take(shown).enumerate() {
        table.add_row(vec![
            Cell::new(i.to_string()),
            Cell::new(bank.to_string()),
            Cell::new(description),
        ]);
    }
    println!("{table}");
    if shown < descriptions.len() {
        println!("... {} more entries", descriptions.len() - shown);
    }
    Ok(())
}

pub(crate) fn convert(path: &Path, bytes: Vec<u8>, output: &Path) -> Result<()> {
    let song = parse(path, &bytes)?;
    let converted = convert_v2_to_v1(&song)
        .with_context(|| format!("cannot convert {}", path.display()))?;
    let out: Vec<u8> = (&converted).into();
    std::fs::write(output, &out)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "wrote {} ({} instructions, {} bytes)",
        output.display(),
        converted.len(),
        out.len()
    );
    Ok(())
}

pub(crate) fn test_roundtrip(path: &Path, bytes: Vec<u8>, diag: bool) -> Result<()> {
    let song = parse(path, &bytes)?;
    let rewritten: Vec<u8> = (&song).into();
    if rewritten == bytes {
        println!("roundtrip OK ({} bytes)", bytes.len());
        return Ok(());
    }
    if diag {
        let mismatch = bytes
            .iter()
            .zip(rewritten.iter())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| bytes.len().min(rewritten.len()));
        println!(
            "first mismatch at offset 0x{:X} (original {} bytes, rewritten {} bytes)",
            mismatch,
            bytes.len(),
            rewritten.len()
        );
        let context_start = mismatch.saturating_sub(8);
        println!(
            "original:  {:02X?}",
            &bytes[context_start..bytes.len().min(mismatch + 8)]
        );
        println!(
            "rewritten: {:02X?}",
            &rewritten[context_start..rewritten.len().min(mismatch + 8)]
        );
    }
    bail!("roundtrip mismatch for {}", path.display());
}
