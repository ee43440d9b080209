use crate::model::{AppState, STATE_VERSION};
use crate::normalize::{self, DocumentKind};
use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const STATE_ENTRY: &str = "state.json";
pub const BUNDLE_FORMAT_V1: &str = "seatingd-state-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub format: String,
    pub classroom_count: usize,
    pub state_sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub format_detected: String,
    pub classroom_count: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn ensure_parent(out_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    Ok(())
}

/// Writes to a sibling temp file, then renames it over `out_path`.
fn write_atomically(out_path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    ensure_parent(out_path)?;
    let mut tmp = out_path.as_os_str().to_owned();
    tmp.push(".exporting");
    let tmp = std::path::PathBuf::from(tmp);
    {
        let mut f = File::create(&tmp)
            .with_context(|| format!("failed to create output file {}", tmp.to_string_lossy()))?;
        f.write_all(bytes).context("failed to write export")?;
        f.flush().context("failed to flush export")?;
    }
    std::fs::rename(&tmp, out_path).with_context(|| {
        format!("failed to move export to {}", out_path.to_string_lossy())
    })?;
    Ok(())
}

pub fn export_state_json(state: &AppState, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let text = serde_json::to_string_pretty(state).context("failed to serialize state")?;
    write_atomically(out_path, text.as_bytes())?;
    tracing::info!(path = %out_path.to_string_lossy(), "exported state json");
    Ok(ExportSummary {
        format: "json".to_string(),
        classroom_count: state.classrooms.len(),
        state_sha256: None,
    })
}

pub fn export_state_bundle(state: &AppState, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let state_text = serde_json::to_string_pretty(state).context("failed to serialize state")?;
    let state_sha256 = sha256_hex(state_text.as_bytes());

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": STATE_VERSION,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "stateSha256": state_sha256,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(STATE_ENTRY, opts)
        .context("failed to start state entry")?;
    zip.write_all(state_text.as_bytes())
        .context("failed to write state entry")?;

    let bytes = zip
        .finish()
        .context("failed to finalize zip bundle")?
        .into_inner();
    write_atomically(out_path, &bytes)?;
    tracing::info!(path = %out_path.to_string_lossy(), "exported state bundle");

    Ok(ExportSummary {
        format: BUNDLE_FORMAT_V1.to_string(),
        classroom_count: state.classrooms.len(),
        state_sha256: Some(state_sha256),
    })
}

fn read_bundle_state(in_path: &Path) -> anyhow::Result<String> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut state_text = String::new();
    archive
        .by_name(STATE_ENTRY)
        .context("bundle missing state.json")?
        .read_to_string(&mut state_text)
        .context("failed to read state.json")?;

    if let Some(expected) = manifest.get("stateSha256").and_then(|v| v.as_str()) {
        let actual = sha256_hex(state_text.as_bytes());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(anyhow!(
                "state.json checksum mismatch (expected {}, got {})",
                expected,
                actual
            ));
        }
    }
    Ok(state_text)
}

/// Reads a bundle or a plain JSON document (current, flat or legacy shape)
/// and returns the normalized state. Only unreadable input is an error.
pub fn import_state(in_path: &Path) -> anyhow::Result<(AppState, ImportSummary)> {
    let (text, bundled) = if is_zip_file(in_path)? {
        (read_bundle_state(in_path)?, true)
    } else {
        let text = std::fs::read_to_string(in_path)
            .with_context(|| format!("failed to read {}", in_path.to_string_lossy()))?;
        (text, false)
    };

    let value: serde_json::Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .context("backup is not valid JSON")?;
    let (state, kind) = normalize::normalize_document(&value);
    let format_detected = match (bundled, kind) {
        (true, _) => BUNDLE_FORMAT_V1.to_string(),
        (false, DocumentKind::Legacy) => "legacy-json".to_string(),
        (false, DocumentKind::State) => "state-json".to_string(),
    };
    tracing::info!(
        path = %in_path.to_string_lossy(),
        format = %format_detected,
        classrooms = state.classrooms.len(),
        "imported state"
    );
    let summary = ImportSummary {
        format_detected,
        classroom_count: state.classrooms.len(),
    };
    Ok((state, summary))
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
