//! Page shell assembly.

const SHELL: &str = include_str!("../embed/shell.html");
const RELOAD_JS: &str = include_str!("../embed/reload.js");

/// Reload client for the push channel on `port`.
pub fn reload_script(port: u16) -> String {
    RELOAD_JS.replace("__RELOAD_PORT__", &port.to_string())
}

/// Wrap rendered page markup in the document shell.
///
/// `styles` goes into a `<style>` before `</head>`, `body` right after
/// `<body>`, and `script` (if any) into a `<script>` before `</body>`.
pub fn assemble(styles: &str, body: &str, script: Option<&str>) -> String {
    let mut html = String::with_capacity(SHELL.len() + styles.len() + body.len() + 64);

    let (head, rest) = SHELL.split_once("</head>").unwrap_or((SHELL, ""));
    html.push_str(head);
    if !styles.is_empty() {
        html.push_str("<style>");
        html.push_str(styles);
        html.push_str("</style>\n");
    }
    html.push_str("</head>");

    let (before_body, rest) = rest.split_once("<body>").unwrap_or((rest, ""));
    html.push_str(before_body);
    html.push_str("<body>");
    html.push_str(body);

    let (inside, tail) = rest.split_once("</body>").unwrap_or((rest, ""));
    html.push_str(inside);
    if let Some(script) = script {
        html.push_str("<script>");
        html.push_str(script);
        html.push_str("</script>\n");
    }
    html.push_str("</body>");
    html.push_str(tail);
    html
}
