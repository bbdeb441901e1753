//! HTML rendering for the form page. Every user-supplied string goes through [`escape`].

use crate::writer::{Platform, PlatformResult};

pub const TITLE: &str = "Social Media Content Writer";
pub const INFO_MESSAGE: &str =
    "Enter a YouTube video ID, select at least one platform, then click 'Generate Content'.";
pub const SUCCESS_MESSAGE: &str = "Content generated!";

/// Values the form is rendered with
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub video_id: String,
    pub platforms: Vec<Platform>,
    pub query: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            video_id: String::new(),
            platforms: Platform::DEFAULT_SELECTION.to_vec(),
            query: crate::writer::DEFAULT_QUERY.to_string(),
        }
    }
}

/// What to show under the form
#[derive(Debug, Clone)]
pub enum Outcome {
    Info,
    Results(Vec<PlatformResult>),
    Error(String),
}

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One checkbox per platform, checked when selected
fn platform_checkboxes(selected: &[Platform]) -> String {
    Platform::ALL
        .iter()
        .map(|platform| {
            format!(
                r#"<label class="platform"><input type="checkbox" name="platforms" value="{slug}"{checked}> {label}</label>"#,
                slug = platform.slug(),
                checked = if selected.contains(platform) { " checked" } else { "" },
                label = escape(platform.label()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n        ")
}

fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Info => format!(r#"<div class="info">{}</div>"#, escape(INFO_MESSAGE)),
        Outcome::Error(message) => format!(r#"<div class="error">Error: {}</div>"#, escape(message)),
        Outcome::Results(results) => {
            let mut html = format!(
                "<div class=\"success\">{}</div>\n<h3>Output by Platform:</h3>\n",
                SUCCESS_MESSAGE
            );
            for result in results {
                let platform = escape(&result.platform);
                let content = escape(&result.content);
                html.push_str(&format!(
                    "<section class=\"result\">\n<h2>{platform}</h2>\n<p><strong>Platform:</strong> {platform}</p>\n<p><strong>Content:</strong> {content}</p>\n<pre><code class=\"language-markdown\">{content}</code></pre>\n</section>\n"
                ));
            }
            html
        }
    }
}

pub fn render_page(form: &FormState, outcome: &Outcome) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <style>
    body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }}
    label {{ display: block; margin-top: 1rem; font-weight: 600; }}
    label.platform {{ display: inline-block; font-weight: normal; margin-right: 1rem; }}
    input[type=text], textarea {{ width: 100%; padding: .4rem; }}
    button {{ margin-top: 1rem; padding: .5rem 1rem; }}
    .info {{ background: #e8f0fe; padding: .8rem; margin-top: 1.5rem; }}
    .success {{ background: #e6f4ea; padding: .8rem; margin-top: 1.5rem; }}
    .error {{ background: #fce8e6; padding: .8rem; margin-top: 1.5rem; }}
    pre {{ background: #f6f8fa; padding: .8rem; white-space: pre-wrap; }}
  </style>
</head>
<body>
  <h1>&#x1F4F9; Social Media Content Writer Agent</h1>
  <form method="post" action="/" onsubmit="this.querySelector('button').textContent='Fetching transcript and generating content...'">
    <label for="video_id">YouTube Video ID</label>
    <input type="text" id="video_id" name="video_id" value="{video_id}">
    <label>Select social media platforms to generate content for:</label>
    <div>
        {checkboxes}
    </div>
    <label for="query">Describe what you want (optional)</label>
    <textarea id="query" name="query" rows="3">{query}</textarea>
    <button type="submit">Generate Content</button>
  </form>
  {outcome}
</body>
</html>
"#,
        title = TITLE,
        video_id = escape(&form.video_id),
        checkboxes = platform_checkboxes(&form.platforms),
        query = escape(&form.query),
        outcome = render_outcome(outcome),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_default_form_checks_default_platforms() {
        let html = render_page(&FormState::default(), &Outcome::Info);
        assert!(html.contains(r#"value="linkedin" checked"#));
        assert!(html.contains(r#"value="instagram" checked"#));
        assert!(html.contains(r#"value="tiktok">"#));
        assert!(html.contains("Generate a post for each selected platform."));
        assert!(html.contains(&escape(INFO_MESSAGE)));
    }

    #[test]
    fn test_results_are_escaped() {
        let html = render_page(
            &FormState::default(),
            &Outcome::Results(vec![PlatformResult {
                platform: "LinkedIn".to_string(),
                content: "<script>alert(1)</script>".to_string(),
            }]),
        );
        assert!(html.contains(SUCCESS_MESSAGE));
        assert!(html.contains("<h2>LinkedIn</h2>"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_error_outcome() {
        let html = render_page(&FormState::default(), &Outcome::Error("boom".to_string()));
        assert!(html.contains("Error: boom"));
    }
}
