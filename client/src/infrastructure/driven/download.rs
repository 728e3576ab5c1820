use std::path::{Path, PathBuf};

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use tracing::info;

use crate::domain::{ApiResponse, Payload};
use crate::error::ApiError;

/// Picks the file name a download should be saved under.
///
/// `filename*=UTF-8''...` wins over `filename="..."`. Both are percent-decoded
/// and fall back to the raw text when that fails. Path separators never
/// survive, so the result always names a file inside the target directory.
pub fn filename_from_content_disposition(header: Option<&str>, fallback: &str) -> String {
    let Some(header) = header else {
        return fallback.to_string();
    };

    let candidate = parameter(header, "filename*")
        .map(|value| strip_charset(&value).to_string())
        .or_else(|| parameter(header, "filename"));

    candidate
        .map(|raw| match percent_decode_str(&raw).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw,
        })
        .map(|name| sanitize(&name))
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| fallback.to_string())
}

fn parameter(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(value.to_string())
    })
}

fn strip_charset(value: &str) -> &str {
    match value.split_once("''") {
        Some((charset, rest)) if charset.eq_ignore_ascii_case("utf-8") => rest,
        _ => value,
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '/' && *c != '\\')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Writes the body of a download response into `dir` and returns the path
pub async fn save_download(
    response: &ApiResponse,
    dir: &Path,
    fallback: &str,
) -> Result<PathBuf, ApiError> {
    let bytes = match &response.payload {
        Payload::Binary(bytes) => bytes.clone(),
        Payload::Json(value) => Bytes::from(serde_json::to_vec_pretty(value)?),
    };

    let name = filename_from_content_disposition(response.header("content-disposition"), fallback);
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, &bytes).await?;

    info!(path = %path.display(), bytes = bytes.len(), "download saved");
    Ok(path)
}
