/*!
 * Normalization of media paths reported by remote players
 *
 * Players report the loaded file either as a plain local path, as a
 * percent-encoded string, or as a URI. Downstream always receives either
 * a local filesystem path or a stringified non-file URI.
 */

use log::trace;
use url::Url;

/// Blank or whitespace-only paths mean "nothing loaded"
pub fn non_blank(path: &str) -> Option<String> {
    if path.trim().is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Resolve a path reported as a URI or percent-encoded string
///
/// * `file:` URIs become local filesystem paths (Windows drive and UNC
///   forms are rendered with backslashes)
/// * other absolute URIs are returned as they are
/// * anything else is percent-decoded
pub fn resolve_media_uri(raw: &str) -> Option<String> {
    let raw = non_blank(raw)?;

    if !looks_like_drive_path(&raw) {
        if let Ok(url) = Url::parse(&raw) {
            let resolved = if url.scheme() == "file" {
                file_uri_to_local_path(&url)
            } else {
                url.to_string()
            };
            trace!("Resolved media URI '{}' to '{}'", raw, resolved);
            return non_blank(&resolved);
        }
    }

    let decoded = percent_decode(&raw);
    non_blank(&decoded)
}

/// "C:\..." or "C:/..." would otherwise parse as a URI with scheme "c"
fn looks_like_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'\\' || bytes[2] == b'/')
}

fn percent_decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}

fn file_uri_to_local_path(url: &Url) -> String {
    let path = percent_decode(url.path());

    match url.host_str() {
        Some(host) if !host.is_empty() && host != "localhost" => {
            format!(r"\\{}{}", host, path.replace('/', "\\"))
        }
        _ => {
            let bytes = path.as_bytes();
            if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
                path[1..].replace('/', "\\")
            } else {
                path
            }
        }
    }
}
