//! Derivation of the HTTP-facing metadata stored with each object.

const ONE_YEAR_IN_SECONDS: u64 = 365 * 24 * 60 * 60;
const FIVE_MINUTES_IN_SECONDS: u64 = 5 * 60;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `inline; filename="<base name>"`
pub fn content_disposition(pathname: &str) -> String {
    let filename = pathname.rsplit('/').next().unwrap_or(pathname);
    format!("inline; filename=\"{filename}\"")
}

/// Client max-age as requested (one year when missing or unparsable), with
/// the shared-cache max-age capped at five minutes.
pub fn cache_control(max_age: Option<&str>) -> String {
    let max_age = max_age
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(ONE_YEAR_IN_SECONDS);
    let edge = max_age.min(FIVE_MINUTES_IN_SECONDS);

    format!("public, max-age={max_age}, s-maxage={edge}")
}

/// The requested content type when non-empty, otherwise a guess from the
/// pathname's extension, otherwise `application/octet-stream`.
///
/// Guessed `text/*` types carry `charset=utf-8`.
pub fn content_type(requested: Option<&str>, pathname: &str) -> String {
    if let Some(ct) = requested.map(str::trim).filter(|ct| !ct.is_empty()) {
        return ct.to_string();
    }

    match mime_guess::from_path(pathname).first() {
        Some(mime)
            if mime.type_() == mime_guess::mime::TEXT && mime.get_param("charset").is_none() =>
        {
            format!("{}; charset=utf-8", mime.essence_str())
        }
        Some(mime) => mime.essence_str().to_string(),
        None => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_control_caps_edge_max_age() {
        assert_eq!(cache_control(Some("600")), "public, max-age=600, s-maxage=300");
        assert_eq!(cache_control(Some("100")), "public, max-age=100, s-maxage=100");
    }

    #[test]
    fn cache_control_defaults_to_one_year() {
        let expected = "public, max-age=31536000, s-maxage=300";
        assert_eq!(cache_control(None), expected);
        assert_eq!(cache_control(Some("")), expected);
        assert_eq!(cache_control(Some("soon")), expected);
        assert_eq!(cache_control(Some("-5")), expected);
    }

    #[test]
    fn disposition_uses_base_name() {
        assert_eq!(
            content_disposition("images/2024/cat.png"),
            "inline; filename=\"cat.png\""
        );
        assert_eq!(content_disposition("cat.png"), "inline; filename=\"cat.png\"");
    }

    #[test]
    fn content_type_prefers_request() {
        assert_eq!(content_type(Some("image/x-custom"), "a.png"), "image/x-custom");
    }

    #[test]
    fn content_type_falls_back_to_extension_then_octet_stream() {
        assert_eq!(content_type(Some(""), "images/cat.PNG"), "image/png");
        assert_eq!(content_type(None, "data.bin"), "application/octet-stream");
        assert_eq!(content_type(None, "Makefile"), "application/octet-stream");
        assert_eq!(content_type(None, ".env"), "application/octet-stream");
    }

    #[test]
    fn guessed_text_types_carry_utf8_charset() {
        assert_eq!(content_type(None, "notes/hello.txt"), "text/plain; charset=utf-8");
        assert_eq!(content_type(None, "site/index.HTML"), "text/html; charset=utf-8");
        assert_eq!(content_type(None, "b.json"), "application/json");
    }

    #[test]
    fn guesses_beyond_common_web_types() {
        assert_eq!(content_type(None, "photo.tiff"), "image/tiff");
        assert_eq!(
            content_type(None, "sheet.xlsx"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(content_type(None, "clip.mov"), "video/quicktime");
    }
}
