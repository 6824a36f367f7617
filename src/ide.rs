//! "Open in IDE" collaborator: builds a custom URI and opens it in a
//! detached context.

use anyhow::Context as _;

pub const DEFAULT_SCHEME: &str = "glasspane";

/// Builds `scheme://open?file=<path>&line=<line>` with escaped values.
pub fn build_open_uri(scheme: &str, path: &str, line: Option<&str>) -> String {
    let mut uri = format!("{scheme}://open?file={}", urlencoding::encode(path));
    if let Some(line) = line {
        uri.push_str("&line=");
        uri.push_str(&urlencoding::encode(line));
    }
    uri
}

pub trait IdeOpener {
    fn open(&self, path: &str, line: Option<&str>) -> anyhow::Result<()>;
}

/// Opens the editor URI via the platform launcher.
pub struct EditorUriOpener {
    scheme: String,
}

impl EditorUriOpener {
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
        }
    }
}

impl Default for EditorUriOpener {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME)
    }
}

impl IdeOpener for EditorUriOpener {
    fn open(&self, path: &str, line: Option<&str>) -> anyhow::Result<()> {
        let uri = build_open_uri(&self.scheme, path, line);
        tracing::info!(%uri, "opening source location");
        open::that_detached(&uri).with_context(|| format!("failed to open {uri}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_includes_escaped_path_and_line() {
        let uri = build_open_uri("glasspane", "src/widgets/side bar.rs", Some("42"));
        assert_eq!(
            uri,
            "glasspane://open?file=src%2Fwidgets%2Fside%20bar.rs&line=42"
        );
    }

    #[test]
    fn uri_omits_line_when_absent() {
        let uri = build_open_uri("editor", "main.rs", None);
        assert_eq!(uri, "editor://open?file=main.rs");
    }
}
