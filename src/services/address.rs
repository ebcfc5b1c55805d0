//! Public addressing for stored objects.
//!
//! Every object is reachable at `{base_url}/public/{store}/{pathname}`; that
//! string is also its metadata index key. Random suffixes keep repeated
//! uploads of one pathname from sharing a URL.

use rand::{Rng, distributions::Alphanumeric};

/// Length of the random token inserted by [`AddressScheme::add_random_suffix`].
pub const RANDOM_SUFFIX_LEN: usize = 30;

const PUBLIC_BASE_PATH: &str = "/public";

#[derive(Clone, Debug)]
pub struct AddressScheme {
    base_url: String,
}

impl AddressScheme {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn public_url(&self, store: &str, pathname: &str) -> String {
        format!("{}{}/{}/{}", self.base_url, PUBLIC_BASE_PATH, store, pathname)
    }

    pub fn download_url(&self, store: &str, pathname: &str) -> String {
        format!("{}?download=1", self.public_url(store, pathname))
    }

    /// Key prefix shared by every object of `store`. Ends with `/` so that a
    /// store named `abc` never matches keys of store `abcd`.
    pub fn store_prefix(&self, store: &str) -> String {
        self.public_url(store, "")
    }

    /// Prefix shared by every public URL this scheme produces.
    pub fn public_root(&self) -> String {
        format!("{}{}/", self.base_url, PUBLIC_BASE_PATH)
    }

    /// Insert `-{token}` before the final extension of `pathname`, drawing
    /// the token from the 62-symbol alphanumeric alphabet.
    pub fn add_random_suffix(&self, pathname: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_SUFFIX_LEN)
            .map(char::from)
            .collect();
        insert_suffix(pathname, &token)
    }
}

/// Insert `-{suffix}` at the final extension boundary of the last path
/// segment. Names without an extension, and dot-files such as `.env`, get
/// the suffix appended.
pub fn insert_suffix(pathname: &str, suffix: &str) -> String {
    let name_start = pathname.rfind('/').map_or(0, |i| i + 1);
    let name = &pathname[name_start..];

    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let at = name_start + dot;
            format!("{}-{}{}", &pathname[..at], suffix, &pathname[at..])
        }
        _ => format!("{pathname}-{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> AddressScheme {
        AddressScheme::new("http://localhost:3001/")
    }

    #[test]
    fn builds_public_and_download_urls() {
        let s = scheme();
        assert_eq!(
            s.public_url("tenantA", "images/cat.png"),
            "http://localhost:3001/public/tenantA/images/cat.png"
        );
        assert_eq!(
            s.download_url("tenantA", "images/cat.png"),
            "http://localhost:3001/public/tenantA/images/cat.png?download=1"
        );
    }

    #[test]
    fn store_prefix_is_slash_terminated() {
        let s = scheme();
        assert_eq!(s.store_prefix("abc"), "http://localhost:3001/public/abc/");
        assert!(!s.public_url("abcd", "x.txt").starts_with(&s.store_prefix("abc")));
    }

    #[test]
    fn suffix_goes_before_final_extension() {
        assert_eq!(insert_suffix("images/cat.png", "X"), "images/cat-X.png");
        assert_eq!(insert_suffix("archive.tar.gz", "X"), "archive.tar-X.gz");
    }

    #[test]
    fn suffix_ignores_extension_text_earlier_in_the_name() {
        assert_eq!(insert_suffix("png.png", "X"), "png-X.png");
        assert_eq!(insert_suffix("a.png/b.png", "X"), "a.png/b-X.png");
    }

    #[test]
    fn suffix_appended_without_extension() {
        assert_eq!(insert_suffix("README", "X"), "README-X");
        assert_eq!(insert_suffix("dir.d/file", "X"), "dir.d/file-X");
        assert_eq!(insert_suffix("conf/.env", "X"), "conf/.env-X");
    }

    #[test]
    fn random_suffix_is_thirty_alphanumerics() {
        let suffixed = scheme().add_random_suffix("doc.txt");
        let token = suffixed
            .strip_prefix("doc-")
            .and_then(|rest| rest.strip_suffix(".txt"))
            .unwrap();
        assert_eq!(token.len(), RANDOM_SUFFIX_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn random_suffixes_differ() {
        let s = scheme();
        assert_ne!(s.add_random_suffix("a.txt"), s.add_random_suffix("a.txt"));
    }
}
