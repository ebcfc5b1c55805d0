//! Represents a blob stored for a tenant, plus the wire shapes derived from it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single object (blob) and the metadata the index keeps for it.
///
/// The record is stored JSON-encoded in the metadata index, keyed by `url`.
/// It describes the content bytes; it never holds them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// Public URL. Doubles as the metadata index key.
    pub url: String,

    /// Public URL with `?download=1` appended.
    pub download_url: String,

    /// Size of the content blob in bytes.
    pub size: u64,

    /// When the object was written.
    pub uploaded_at: DateTime<Utc>,

    /// Pathname as the caller requested it, before any random suffix.
    pub pathname: String,

    /// Content type (MIME type).
    pub content_type: String,

    /// `inline; filename="..."` built from the pathname's base name.
    pub content_disposition: String,

    /// `public, max-age=..., s-maxage=...`
    pub cache_control: String,

    /// Location of the blob relative to the content root (`store/on-disk-pathname`).
    pub file_path: String,
}

impl Object {
    /// Upload time formatted as RFC 3339 with second precision.
    pub fn uploaded_at_iso(&self) -> String {
        self.uploaded_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Options accepted by a put.
#[derive(Clone, Debug, Default)]
pub struct PutOptions {
    /// Requested pathname within the store, e.g. `images/cat.png`.
    pub pathname: String,
    pub add_random_suffix: bool,
    /// Empty or missing means "guess from the pathname".
    pub content_type: Option<String>,
    /// Raw max-age in seconds; unparsable values fall back to one year.
    pub cache_control_max_age: Option<String>,
}

/// Options accepted by a copy. Same as [`PutOptions`], naming the destination.
#[derive(Clone, Debug, Default)]
pub struct CopyOptions {
    pub destination_pathname: String,
    pub add_random_suffix: bool,
    pub content_type: Option<String>,
    pub cache_control_max_age: Option<String>,
}

impl From<CopyOptions> for PutOptions {
    fn from(options: CopyOptions) -> Self {
        Self {
            pathname: options.destination_pathname,
            add_random_suffix: options.add_random_suffix,
            content_type: options.content_type,
            cache_control_max_age: options.cache_control_max_age,
        }
    }
}

/// Result of a put or copy as returned to clients.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PutBlobResult {
    pub url: String,
    pub download_url: String,
    pub pathname: String,
    pub content_type: String,
    pub content_disposition: String,
}

impl From<&Object> for PutBlobResult {
    fn from(o: &Object) -> Self {
        Self {
            url: o.url.clone(),
            download_url: o.download_url.clone(),
            pathname: o.pathname.clone(),
            content_type: o.content_type.clone(),
            content_disposition: o.content_disposition.clone(),
        }
    }
}

/// Full metadata view returned by a head request.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HeadBlobResult {
    pub url: String,
    pub download_url: String,
    pub size: u64,
    pub uploaded_at: String,
    pub pathname: String,
    pub content_type: String,
    pub content_disposition: String,
    pub cache_control: String,
}

impl From<&Object> for HeadBlobResult {
    fn from(o: &Object) -> Self {
        Self {
            url: o.url.clone(),
            download_url: o.download_url.clone(),
            size: o.size,
            uploaded_at: o.uploaded_at_iso(),
            pathname: o.pathname.clone(),
            content_type: o.content_type.clone(),
            content_disposition: o.content_disposition.clone(),
            cache_control: o.cache_control.clone(),
        }
    }
}

/// One entry of a list response.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListBlobResult {
    pub url: String,
    pub download_url: String,
    pub size: u64,
    pub uploaded_at: String,
    pub pathname: String,
    pub content_type: String,
    pub content_disposition: String,
}

impl From<&Object> for ListBlobResult {
    fn from(o: &Object) -> Self {
        Self {
            url: o.url.clone(),
            download_url: o.download_url.clone(),
            size: o.size,
            uploaded_at: o.uploaded_at_iso(),
            pathname: o.pathname.clone(),
            content_type: o.content_type.clone(),
            content_disposition: o.content_disposition.clone(),
        }
    }
}

/// List response. There is no pagination, so `has_more` is always false.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub blobs: Vec<ListBlobResult>,
    pub has_more: bool,
}

impl ListResult {
    pub fn from_objects(objects: &[Object]) -> Self {
        Self {
            blobs: objects.iter().map(ListBlobResult::from).collect(),
            has_more: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Object {
        Object {
            url: "http://localhost:3001/public/s1/a.txt".into(),
            download_url: "http://localhost:3001/public/s1/a.txt?download=1".into(),
            size: 5,
            uploaded_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            pathname: "a.txt".into(),
            content_type: "text/plain".into(),
            content_disposition: "inline; filename=\"a.txt\"".into(),
            cache_control: "public, max-age=31536000, s-maxage=300".into(),
            file_path: "s1/a.txt".into(),
        }
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["downloadUrl"], "http://localhost:3001/public/s1/a.txt?download=1");
        assert_eq!(json["filePath"], "s1/a.txt");
        assert!(json.get("download_url").is_none());
    }

    #[test]
    fn head_view_formats_upload_time_and_hides_file_path() {
        let head = serde_json::to_value(HeadBlobResult::from(&sample())).unwrap();
        assert_eq!(head["uploadedAt"], "2024-03-01T12:30:00Z");
        assert_eq!(head["cacheControl"], "public, max-age=31536000, s-maxage=300");
        assert!(head.get("filePath").is_none());
    }

    #[test]
    fn list_view_never_reports_more_pages() {
        let list = serde_json::to_value(ListResult::from_objects(&[sample()])).unwrap();
        assert_eq!(list["hasMore"], false);
        assert_eq!(list["blobs"][0]["size"], 5);
        assert!(list["blobs"][0].get("cacheControl").is_none());
    }

    #[test]
    fn copy_options_map_destination_to_pathname() {
        let put: PutOptions = CopyOptions {
            destination_pathname: "b/c.txt".into(),
            add_random_suffix: true,
            ..Default::default()
        }
        .into();
        assert_eq!(put.pathname, "b/c.txt");
        assert!(put.add_random_suffix);
    }
}
