//! Audio part helpers for the submit-audio endpoint.

/// Infers the multipart content type from an audio file extension.
#[must_use]
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        _ => "audio/mpeg",
    }
}

/// Resolves a reply-audio path from the backend into an absolute URL.
///
/// The backend returns relative paths for its own hosted audio; absolute
/// URLs pass through untouched.
#[must_use]
pub fn resolve_reply_audio_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }

    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
