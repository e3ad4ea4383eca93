//! Rendering projects for preview and download.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::GeneratedProject;

/// Sandbox policy for the embedded preview frame: scripts run, but the
/// document gets an opaque origin and cannot navigate the top window.
pub const SANDBOX_POLICY: &str = "allow-scripts";

fn body_regex() -> &'static Regex {
    static BODY: OnceLock<Regex> = OnceLock::new();
    BODY.get_or_init(|| {
        Regex::new(r"(?is)<body[^>]*>(.*?)</body>").expect("body pattern is valid")
    })
}

/// Inner HTML of the `<body>` element, or the whole input if there is none.
pub fn extract_body(html: &str) -> &str {
    body_regex()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html)
}

/// Self-contained single-file document: the project's CSS inlined in the
/// head, its body markup, and its JS inlined at the end of the body.
pub fn render_document(project: &GeneratedProject) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
{css}
    </style>
</head>
<body>
{body}
    <script>
{js}
    </script>
</body>
</html>"#,
        title = escape_html(&project.name),
        css = project.css,
        body = extract_body(&project.html),
        js = project.js,
    )
}

/// Embedded frame markup for a rendered document, restricted by
/// [`SANDBOX_POLICY`].
pub fn sandboxed_frame(document: &str) -> String {
    format!(
        r#"<iframe sandbox="{}" srcdoc="{}" title="Project Preview"></iframe>"#,
        SANDBOX_POLICY,
        escape_attr(document)
    )
}

/// Backend-served preview address: whole project, or a single file.
pub fn preview_url(base_url: &str, path: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match path.map(|p| p.trim_start_matches('/')).filter(|p| !p.is_empty()) {
        Some(path) => format!("{}/preview/{}", base, path),
        None => format!("{}/preview/", base),
    }
}

/// File name for a downloaded single-file project: lowercase, whitespace
/// runs collapsed to `-`.
pub fn download_name(project_name: &str) -> String {
    let slug = project_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    let slug = if slug.is_empty() { "project".to_string() } else { slug };
    format!("{}.html", slug)
}

/// Archive name used for job downloads.
pub fn archive_name(job_id: &str) -> String {
    format!("generated_project_{}.zip", job_id)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> GeneratedProject {
        GeneratedProject {
            id: "1".into(),
            name: "My Todo App".into(),
            description: "list".into(),
            html: "<html><head><title>x</title></head><BODY class=\"main\">\n<h1>Todo</h1>\n</BODY></html>".into(),
            css: "h1 { color: red; }".into(),
            js: "console.log('hi');".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            status: None,
        }
    }

    #[test]
    fn test_extract_body() {
        assert_eq!(extract_body("<body><p>x</p></body>"), "<p>x</p>");
        assert_eq!(extract_body("<p>fragment</p>"), "<p>fragment</p>");
        assert_eq!(extract_body(&project().html).trim(), "<h1>Todo</h1>");
    }

    #[test]
    fn test_render_document() {
        let doc = render_document(&project());
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>My Todo App</title>"));
        assert!(doc.contains("h1 { color: red; }"));
        assert!(doc.contains("<h1>Todo</h1>"));
        assert!(doc.contains("console.log('hi');"));
        // Only the body content is kept, not the original head.
        assert!(!doc.contains("<title>x</title>"));
    }

    #[test]
    fn test_sandboxed_frame() {
        let frame = sandboxed_frame("<p class=\"a\">x</p>");
        assert!(frame.contains(r#"sandbox="allow-scripts""#));
        assert!(!frame.contains("allow-same-origin"));
        assert!(!frame.contains("allow-top-navigation"));
        assert!(frame.contains("&lt;p class=&quot;a&quot;&gt;"));
    }

    #[test]
    fn test_preview_url() {
        assert_eq!(
            preview_url("http://localhost:5000/", None),
            "http://localhost:5000/preview/"
        );
        assert_eq!(
            preview_url("http://localhost:5000", Some("/css/style.css")),
            "http://localhost:5000/preview/css/style.css"
        );
        assert_eq!(preview_url("http://h", Some("")), "http://h/preview/");
    }

    #[test]
    fn test_download_names() {
        assert_eq!(download_name("My  Todo\tApp"), "my-todo-app.html");
        assert_eq!(download_name("  "), "project.html");
        assert_eq!(archive_name("abc"), "generated_project_abc.zip");
    }
}
