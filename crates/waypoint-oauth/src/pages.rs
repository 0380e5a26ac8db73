//! Styled HTML pages for the OAuth flow.
//!
//! The OAuth surface is browser-facing, so its terminal states are small
//! self-contained HTML pages: a provider landing page, a success page,
//! and an error page with a retry affordance.  Diagnostic detail stays in
//! the server logs; these pages only carry a short human message.

/// Shared card styling for every OAuth page.
const PAGE_STYLE: &str = r#"
  body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
    display: flex;
    justify-content: center;
    align-items: center;
    min-height: 100vh;
    margin: 0;
    background-color: #f5f5f5;
  }
  .container {
    text-align: center;
    padding: 2rem;
    background: white;
    border-radius: 8px;
    box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
  }
  .message {
    color: #666;
    margin-bottom: 2rem;
  }
  .button {
    display: inline-block;
    color: white;
    padding: 12px 24px;
    border-radius: 4px;
    text-decoration: none;
    font-weight: 500;
  }
"#;

fn page(title: &str, heading_color: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>{PAGE_STYLE}
      h1 {{ color: {heading_color}; margin-bottom: 1rem; }}
    </style>
  </head>
  <body>
    <div class="container">
{body}
    </div>
  </body>
</html>
"#
    )
}

/// HTML-escape text interpolated into a page.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The landing page inviting the user to continue to the provider.
#[must_use]
pub fn landing_page(provider_title: &str, authorize_url: &str) -> String {
    let title = format!("{} Authentication", escape(provider_title));
    let body = format!(
        r#"      <h1>{heading}</h1>
      <a href="{url}" class="button" style="background-color: #4285f4;">Continue with {provider}</a>"#,
        heading = title,
        url = escape(authorize_url),
        provider = escape(provider_title),
    );
    page(&title, "#333", &body)
}

/// The terminal success page.
#[must_use]
pub fn success_page(message: &str) -> String {
    let body = format!(
        r#"      <h1>Success!</h1>
      <p class="message">{message}</p>
      <a href="/" class="button" style="background-color: #43a047;">Continue</a>"#,
        message = escape(message),
    );
    page("Authentication Success", "#43a047", &body)
}

/// The terminal error page with a retry affordance back into the flow.
#[must_use]
pub fn error_page(provider: &str, message: &str) -> String {
    let body = format!(
        r#"      <h1>Authentication Error</h1>
      <p class="message">{message}</p>
      <a href="/oauth/{provider}" class="button" style="background-color: #4285f4;">Try Again</a>"#,
        message = escape(message),
        provider = escape(provider),
    );
    page("Authentication Error", "#d32f2f", &body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_page_links_authorize_url() {
        let html = landing_page("Google", "https://accounts.google.com/auth?x=1");
        assert!(html.contains("Continue with Google"));
        assert!(html.contains("https://accounts.google.com/auth?x=1"));
        assert!(html.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn success_page_carries_message() {
        let html = success_page("Successfully authenticated with Google!");
        assert!(html.contains("Success!"));
        assert!(html.contains("Successfully authenticated with Google!"));
    }

    #[test]
    fn error_page_offers_retry() {
        let html = error_page("notion", "invalid state parameter");
        assert!(html.contains("Authentication Error"));
        assert!(html.contains("invalid state parameter"));
        assert!(html.contains("href=\"/oauth/notion\""));
        assert!(html.contains("Try Again"));
    }

    #[test]
    fn interpolated_text_is_escaped() {
        let html = error_page("g", "<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
