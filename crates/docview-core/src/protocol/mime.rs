//! File-extension → MIME content-type lookup.
//!
//! The lookup is total: a registered extension yields its content type, any
//! other input yields `None`.  It never fails and never allocates.
//!
//! Extensions are matched case-insensitively and after stripping a single
//! leading `.` separator, so `"pdf"`, `".pdf"` and `".PDF"` all resolve to
//! `application/pdf`.

/// Registered extensions and their content types.
///
/// Kept sorted by extension so the table is easy to scan by eye.
const MIME_TABLE: &[(&str, &str)] = &[
    ("bmp", "image/bmp"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("docm", "application/vnd.ms-word.document.macroEnabled.12"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("dot", "application/msword"),
    (
        "dotx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.template",
    ),
    ("gif", "image/gif"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("jp2", "image/jp2"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("md", "text/markdown"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("pot", "application/vnd.ms-powerpoint"),
    ("pps", "application/vnd.ms-powerpoint"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("rtf", "application/rtf"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("txt", "text/plain"),
    ("webp", "image/webp"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsm", "application/vnd.ms-excel.sheet.macroEnabled.12"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("xod", "application/vnd.ms-xpsdocument"),
    ("xps", "application/vnd.ms-xpsdocument"),
];

/// Trims surrounding whitespace and strips one leading `.` separator from a
/// file extension.
///
/// Applied uniformly on every path that resolves a content type, so callers
/// can pass backend-provided extensions (`".pdf"`) and bus-provided
/// extensions (`"pdf"`) interchangeably.
///
/// # Example
///
/// ```rust
/// use docview_core::normalize_extension;
///
/// assert_eq!(normalize_extension(".pdf"), "pdf");
/// assert_eq!(normalize_extension("pdf"), "pdf");
/// assert_eq!(normalize_extension(" .pdf "), "pdf");
/// ```
pub fn normalize_extension(extension: &str) -> &str {
    let extension = extension.trim();
    extension.strip_prefix('.').unwrap_or(extension)
}

/// Returns the registered content type for `extension`, or `None` when the
/// extension is unknown.
///
/// # Example
///
/// ```rust
/// use docview_core::mime_type_for;
///
/// assert_eq!(mime_type_for("pdf"), Some("application/pdf"));
/// assert_eq!(mime_type_for(".PNG"), Some("image/png"));
/// assert_eq!(mime_type_for("nope"), None);
/// ```
pub fn mime_type_for(extension: &str) -> Option<&'static str> {
    let ext = normalize_extension(extension);
    MIME_TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
