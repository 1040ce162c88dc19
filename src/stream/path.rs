use std::collections::HashMap;

/// Canonical `/app/name` location of a live stream plus the arguments
/// passed after `?` in the publish or play name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPath {
    pub path: String,
    pub args: HashMap<String, String>,
}

impl StreamPath {
    /// Build from the connected application and a `name[?query]` argument
    pub fn parse(app: &str, stream_name: &str) -> Self {
        let (name, query) = match stream_name.split_once('?') {
            Some((name, query)) => (name, query),
            None => (stream_name, ""),
        };

        let args = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        StreamPath {
            path: format!("/{}/{}", app, name),
            args,
        }
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }
}

impl std::fmt::Display for StreamPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Application name as announced in `connect`, with slashes removed
pub fn normalize_app_name(app: &str) -> String {
    app.replace('/', "")
}
