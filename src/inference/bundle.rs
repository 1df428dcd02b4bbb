use std::io::{Cursor, Read};

use crate::{
    data_types::analysis::{is_success_status, AnalysisBundle, BundleAnalysis},
    error::{GatewayError, Result},
};

pub const ANALYSIS_ENTRY: &str = "analysis_results.json";

fn is_annotated_video(name: &str) -> bool {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    file_name.starts_with("annotated_") && file_name.ends_with(".mp4")
}

fn read_entry(entry: &mut zip::read::ZipFile) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buffer)
        .map_err(|err| GatewayError::upstream(format!("reading {}: {}", entry.name(), err)))?;

    Ok(buffer)
}

/// Reads `analysis_results.json` and the optional annotated video out of a result archive.
pub fn unpack(archive: &[u8]) -> Result<AnalysisBundle> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;

    let mut analysis_json: Option<Vec<u8>> = None;
    let mut annotated_video: Option<Vec<u8>> = None;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        if name == ANALYSIS_ENTRY || name.ends_with(&format!("/{}", ANALYSIS_ENTRY)) {
            analysis_json = Some(read_entry(&mut entry)?);
        } else if annotated_video.is_none() && is_annotated_video(&name) {
            annotated_video = Some(read_entry(&mut entry)?);
        }
    }

    let analysis_json = analysis_json.ok_or_else(|| {
        GatewayError::upstream(format!("{} not found in result archive", ANALYSIS_ENTRY))
    })?;

    let analysis: BundleAnalysis = serde_json::from_slice(&analysis_json).map_err(|err| {
        GatewayError::upstream(format!("malformed {}: {}", ANALYSIS_ENTRY, err))
    })?;

    if let Some(status) = analysis.status.as_deref() {
        if !is_success_status(status) {
            return Err(GatewayError::upstream(format!(
                "inference service reported status {:?}",
                status
            )));
        }
    }

    Ok(AnalysisBundle {
        analysis,
        annotated_video,
    })
}
