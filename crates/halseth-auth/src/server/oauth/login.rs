//! HTML passphrase form for OAuth authorization.

use super::service::AuthorizeParams;

/// Render the authorization form.
///
/// Every request parameter is echoed back as a hidden field so the
/// submission carries it unchanged. All values are HTML-escaped.
pub fn render_authorize_form(
    system_name: &str,
    params: &AuthorizeParams,
    error_message: Option<&str>,
) -> String {
    let error_html = error_message
        .map(|msg| format!(r#"<p class="error">{}</p>"#, html_escape(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Authorize - {system_name}</title>
<style>
body {{ font-family: system-ui, -apple-system, sans-serif; background: #0e0e10; color: #e4e4e7; margin: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; }}
.card {{ background: #18181b; border: 1px solid #27272a; border-radius: 12px; padding: 32px; max-width: 360px; width: 100%; }}
h1 {{ font-size: 18px; margin: 0 0 6px; }}
.subtitle {{ color: #71717a; font-size: 13px; margin: 0 0 24px; }}
label {{ display: block; font-size: 13px; color: #a1a1aa; margin-bottom: 6px; }}
input[type="password"] {{ width: 100%; padding: 8px 12px; background: #09090b; border: 1px solid #3f3f46; border-radius: 8px; color: #e4e4e7; font-size: 14px; box-sizing: border-box; }}
input[type="password"]:focus {{ outline: none; border-color: #6366f1; }}
.error {{ color: #f87171; font-size: 13px; margin-top: 12px; }}
button {{ width: 100%; padding: 9px; background: #6366f1; color: #fff; border: none; border-radius: 8px; font-size: 14px; font-weight: 500; cursor: pointer; margin-top: 16px; }}
button:hover {{ background: #4f46e5; }}
</style>
</head>
<body>
<div class="card">
<h1>Authorize {system_name}</h1>
<p class="subtitle">Enter the admin passphrase to grant access.</p>
<form method="POST" action="/oauth/authorize">
<input type="hidden" name="client_id" value="{client_id}">
<input type="hidden" name="redirect_uri" value="{redirect_uri}">
<input type="hidden" name="state" value="{state}">
<input type="hidden" name="code_challenge" value="{code_challenge}">
<input type="hidden" name="code_challenge_method" value="{code_challenge_method}">
<label for="secret">Admin passphrase</label>
<input type="password" id="secret" name="secret" autocomplete="current-password" autofocus>
{error_html}
<button type="submit">Authorize</button>
</form>
</div>
</body>
</html>"#,
        system_name = html_escape(system_name),
        client_id = html_escape(params.client_id()),
        redirect_uri = html_escape(params.redirect_uri()),
        state = html_escape(params.state()),
        code_challenge = html_escape(params.code_challenge()),
        code_challenge_method = html_escape(params.code_challenge_method()),
        error_html = error_html,
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
