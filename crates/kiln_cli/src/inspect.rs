//! `kiln inspect` and `kiln fingerprint`.

use std::path::Path;

use kiln_cache::fingerprint::artifact_fingerprint;
use kiln_cache::{cache_name_from_path, CacheKey, CacheStore};
use kiln_common::Fingerprint;
use serde::Serialize;

use crate::project::Project;
use crate::{GlobalArgs, InspectArgs, ReportFormat};

/// What `kiln inspect` reports about one cache entry.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EntryReport {
    /// Cache name.
    pub name: String,
    /// Decoded key, if the key file exists and is well formed.
    pub key: Option<CacheKey>,
    /// Length of the key file in bytes, if it exists.
    pub key_len: Option<usize>,
    /// Size of the binary in bytes, if it exists.
    pub artifact_bytes: Option<usize>,
    /// Fingerprint of the binary on disk.
    pub artifact_fingerprint: Option<Fingerprint>,
    /// Whether the binary on disk matches the key's artifact fingerprint.
    pub artifact_matches: bool,
}

/// Collects the report for `name` in `store`.
pub fn report(store: &CacheStore, name: &str) -> Result<EntryReport, Box<dyn std::error::Error>> {
    let text = store.read_key(name)?;
    let artifact = store.read_artifact(name)?;

    let key = text.as_deref().and_then(CacheKey::decode);
    let fingerprint = artifact.as_deref().map(artifact_fingerprint);
    let artifact_matches = matches!((key, fingerprint), (Some(k), Some(fp)) if k.artifact == fp);

    Ok(EntryReport {
        name: name.to_string(),
        key,
        key_len: text.map(|t| t.len()),
        artifact_bytes: artifact.map(|a| a.len()),
        artifact_fingerprint: fingerprint,
        artifact_matches,
    })
}

/// Renders a report for the terminal.
pub fn render_text(report: &EntryReport) -> String {
    let mut out = format!("entry:    {}\n", report.name);
    match (&report.key, report.key_len) {
        (Some(key), _) => {
            out.push_str(&format!("device:   {}\n", key.device));
            out.push_str(&format!("source:   {}\n", key.source));
            out.push_str(&format!("artifact: {}\n", key.artifact));
        }
        (None, Some(len)) => out.push_str(&format!("key:      malformed ({len} bytes)\n")),
        (None, None) => out.push_str("key:      missing\n"),
    }
    match (report.artifact_bytes, report.artifact_fingerprint) {
        (Some(bytes), Some(fp)) => {
            let status = if report.artifact_matches { "ok" } else { "MISMATCH" };
            out.push_str(&format!("binary:   {bytes} bytes, {fp} [{status}]\n"));
        }
        _ => out.push_str("binary:   missing\n"),
    }
    out
}

/// Runs the `kiln inspect` command.
///
/// Returns exit code 0 if the entry exists and its binary matches its key.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load(global)?;
    let store = CacheStore::new(&project.cache_dir());

    // Accept a source path as well as a bare name.
    let name = if args.name.contains(['/', '\\']) {
        cache_name_from_path(Path::new(&args.name))
            .ok_or_else(|| format!("cannot derive a cache name from '{}'", args.name))?
    } else {
        args.name.clone()
    };

    let report = report(&store, &name)?;
    match args.format {
        ReportFormat::Text => print!("{}", render_text(&report)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(if report.artifact_matches { 0 } else { 1 })
}

/// Runs the `kiln fingerprint` command.
pub fn fingerprint(file: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    let bytes =
        std::fs::read(file).map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    println!("{}  {}", Fingerprint::of(&bytes), file.display());
    Ok(0)
}
