//! URL path cleaning.

/// Split a URL path into clean components.
///
/// Redundant separators and `.` are dropped and `..` removes the previous
/// component. A `..` at the root stays at the root, so the result never
/// escapes the store.
pub fn components(path: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other.to_string()),
        }
    }
    out
}

/// Clean a URL path into its canonical `/a/b` form. The root is `/`.
pub fn clean(path: &str) -> String {
    format!("/{}", components(path).join("/"))
}
