//! HTML served by the handlers.

use std::fmt::Write as _;

use crate::registrant::Registrant;

/// The registration form served at `/`.
pub const FORM_PAGE: &str = include_str!("../../assets/form.html");

/// The bare login form served by `GET /users`.
pub const LOGIN_FORM: &str = r#"
<form action="" method="post">
    <p><input type=text name=username required>
    <p><input type=password name=password required>
    <p><input type=submit value=Login>
</form>
"#;

/// Escape text for inclusion in HTML element content or a quoted attribute.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render every registrant as an HTML table.
#[must_use]
pub fn registrants_table(registrants: &[Registrant]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Registrants</title></head>\n<body>\n",
    );
    let _ = writeln!(html, "<h1>Registrants ({})</h1>", registrants.len());
    html.push_str(
        "<table>\n<tr><th>CodeX ID</th><th>Name</th><th>Email</th><th>Phone</th><th>Department</th></tr>\n",
    );
    for r in registrants {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            r.id,
            escape_html(&r.name),
            escape_html(&r.email),
            r.phone,
            escape_html(r.department.display_name()),
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}
