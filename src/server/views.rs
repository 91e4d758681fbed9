use snaptext::ocr::Language;
use snaptext::pipeline::RecognitionOutcome;

use crate::session::LastResult;

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        html_escape(title),
        body
    )
}

fn flash_list(flashes: &[String]) -> String {
    if flashes.is_empty() {
        return String::new();
    }
    let items: String = flashes
        .iter()
        .map(|f| format!("<li>{}</li>", html_escape(f)))
        .collect();
    format!("<ul class=\"flash\">{}</ul>", items)
}

fn language_options(selected: Language) -> String {
    Language::ALL
        .iter()
        .map(|lang| {
            format!(
                "<option value=\"{}\"{}>{}</option>",
                lang.code(),
                if *lang == selected { " selected" } else { "" },
                lang.display_name()
            )
        })
        .collect()
}

pub fn render_index(flashes: &[String], last: Option<&LastResult>) -> String {
    let mut body = String::new();
    body.push_str(&flash_list(flashes));
    body.push_str("<h1>Image to text</h1>\n");

    let selected = last.map(|l| l.lang).unwrap_or_default();
    body.push_str(&format!(
        "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"image\" accept=\"image/*\">\n\
         <select name=\"lang\">{}</select>\n\
         <button type=\"submit\">Extract text</button>\n\
         </form>\n",
        language_options(selected)
    ));

    if let Some(last) = last {
        body.push_str(&format!(
            "<h2>Last result ({}, {})</h2>\n<pre>{}</pre>\n<p><a href=\"/download/{}\">Download {}</a></p>\n",
            html_escape(last.lang.display_name()),
            html_escape(&last.at),
            html_escape(&last.text),
            html_escape(&last.artifact_name),
            html_escape(&last.artifact_name),
        ));
    }

    page("Image to text", &body)
}

pub fn render_result(outcome: &RecognitionOutcome) -> String {
    let mut body = String::new();
    body.push_str(&flash_list(&outcome.warnings));
    body.push_str(&format!(
        "<h1>Extracted text ({})</h1>\n",
        html_escape(outcome.lang.display_name())
    ));
    body.push_str(&format!(
        "<p><img src=\"/uploads/{0}\" alt=\"{0}\" style=\"max-width: 480px\"></p>\n",
        html_escape(&outcome.image_name)
    ));
    body.push_str(&format!("<pre>{}</pre>\n", html_escape(&outcome.text)));

    match &outcome.artifact_name {
        Some(name) => body.push_str(&format!(
            "<p><a href=\"/download/{0}\">Download {0}</a></p>\n",
            html_escape(name)
        )),
        None => body.push_str("<p>Text file unavailable.</p>\n"),
    }
    body.push_str("<p><a href=\"/\">Upload another image</a></p>\n");

    page("Extracted text", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape("<script>\"x\" & 'y'</script>"),
            "&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn index_shows_flashes_and_last_result() {
        let last = LastResult {
            artifact_name: "abc.txt".into(),
            lang: Language::Khm,
            text: "extracted <text>".into(),
            at: "2024-01-01 00:00:00".into(),
        };
        let html = render_index(&["File type not allowed".into()], Some(&last));

        assert!(html.contains("File type not allowed"));
        assert!(html.contains("/download/abc.txt"));
        assert!(html.contains("extracted &lt;text&gt;"));
        assert!(html.contains("value=\"khm\" selected"));
    }

    #[test]
    fn result_links_artifact_when_present() {
        let outcome = RecognitionOutcome {
            image_name: "abc.png".into(),
            text: "hello".into(),
            lang: Language::Eng,
            artifact_name: Some("abc.txt".into()),
            warnings: vec![],
        };
        let html = render_result(&outcome);
        assert!(html.contains("/uploads/abc.png"));
        assert!(html.contains("/download/abc.txt"));

        let degraded = RecognitionOutcome {
            artifact_name: None,
            ..outcome
        };
        let html = render_result(&degraded);
        assert!(html.contains("Text file unavailable"));
    }
}
