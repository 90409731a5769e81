//! Bare HTML pages shown to visitors when a short URL or snapshot leads
//! nowhere. Everything interpolated is escaped.

use domain::snapshot::html_escape;
use domain::RedirectError;

pub fn redirect_error(err: &RedirectError, site_name: &str) -> String {
    let title = match err {
        RedirectError::MissingCode => "Incomplete link",
        RedirectError::NotFound | RedirectError::Lookup(_) => "Link not found",
    };
    page(title, err.user_message(), site_name)
}

pub fn snapshot_missing(site_name: &str) -> String {
    page(
        "Link not found",
        RedirectError::NotFound.user_message(),
        site_name,
    )
}

fn page(title: &str, message: &str, site_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex">
<title>{title} | {site}</title>
</head>
<body>
<main>
<h1>{title}</h1>
<p>{message}</p>
</main>
</body>
</html>
"#,
        title = html_escape(title),
        site = html_escape(site_name),
        message = html_escape(message),
    )
}
