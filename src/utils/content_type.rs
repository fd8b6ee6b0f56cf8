use std::path::Path;

/// Fallback for names whose extension is missing or unknown.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Infer a content type from an entry name's extension.
///
/// Only the final path component is considered, case-insensitively. Unknown or missing
/// extensions fall back to [`FALLBACK_CONTENT_TYPE`].
pub fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let Some(extension) = extension else {
        return FALLBACK_CONTENT_TYPE;
    };

    match extension.as_str() {
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "xml" => "application/xml",
        "js" | "mjs" => "application/javascript",
        "wasm" => "application/wasm",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "yaml" | "yml" => "application/yaml",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/vnd.microsoft.icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Same as [`content_type_for`], parsed into a [`mime::Mime`].
pub fn mime_for(name: &str) -> mime::Mime {
    content_type_for(name)
        .parse()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
