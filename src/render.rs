use std::fmt::Write;

use crate::metadata::{HIGHEST, PageModel, PlaylistPage, VideoPage};

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;padding:0 1em}\
.error{color:#b00020}\
.entry{display:flex;gap:1em;align-items:center;padding:.4em}\
.entry.highlighted{background:#fff3c4}\
img.thumb{max-width:160px}";

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Video Downloader</title>\n<style>{}</style>\n</head>\n<body>\n<h1>Video Downloader</h1>\n{}</body>\n</html>\n",
        STYLE, body
    )
}

fn url_form(url: Option<&str>) -> String {
    format!(
        "<form method=\"post\" action=\"/\">\n<input type=\"url\" name=\"url\" size=\"60\" placeholder=\"https://www.youtube.com/watch?v=...\" value=\"{}\">\n<button type=\"submit\">Fetch</button>\n</form>\n",
        escape_html(url.unwrap_or(""))
    )
}

/// The submission form, optionally with an error above it.
pub fn render_home(error: Option<&str>, url: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(error) = error {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(error));
    }
    body.push_str(&url_form(url));
    layout(&body)
}

pub fn render_page(model: &PageModel) -> String {
    match model {
        PageModel::Video(page) => render_video(page),
        PageModel::Playlist(page) => render_playlist(page),
    }
}

fn video_link(video_id: &str, resolution: &str) -> String {
    format!(
        "/download/video/{}/?resolution={}",
        urlencoding::encode(video_id),
        urlencoding::encode(resolution)
    )
}

fn thumbnail_link(video_id: &str) -> String {
    format!("/download/thumbnail/{}/", urlencoding::encode(video_id))
}

fn render_video(page: &VideoPage) -> String {
    let mut body = url_form(Some(&page.url));
    let _ = writeln!(body, "<h2>{}</h2>", escape_html(&page.title));
    if let Some(thumbnail) = &page.thumbnail_url {
        let _ = writeln!(
            body,
            "<p><img class=\"thumb\" src=\"{}\" alt=\"\"> <a href=\"{}\">Download thumbnail</a></p>",
            escape_html(thumbnail),
            escape_html(&thumbnail_link(&page.video_id))
        );
    }

    if page.resolutions.is_empty() {
        body.push_str("<p>No downloadable resolutions are available for this video.</p>\n");
    } else {
        body.push_str("<ul class=\"resolutions\">\n");
        let _ = writeln!(
            body,
            "<li><a href=\"{}\">Highest available</a></li>",
            escape_html(&video_link(&page.video_id, HIGHEST))
        );
        for resolution in &page.resolutions {
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&video_link(&page.video_id, resolution)),
                escape_html(resolution)
            );
        }
        body.push_str("</ul>\n");
    }
    layout(&body)
}

fn render_playlist(page: &PlaylistPage) -> String {
    let mut body = url_form(Some(&page.url));
    let _ = writeln!(body, "<h2>{}</h2>", escape_html(&page.playlist_title));
    body.push_str("<form method=\"post\" action=\"/download/playlist/\">\n");

    for entry in &page.entries {
        let class = if entry.highlighted { "entry highlighted" } else { "entry" };
        let _ = writeln!(body, "<div class=\"{}\">", class);
        let _ = writeln!(
            body,
            "<input type=\"checkbox\" name=\"selected_videos\" value=\"{}\" checked>",
            escape_html(&entry.video_id)
        );
        let _ = writeln!(body, "<span>{}.</span>", entry.position);
        if let Some(thumbnail) = &entry.thumbnail_url {
            let _ = writeln!(body, "<img class=\"thumb\" src=\"{}\" alt=\"\">", escape_html(thumbnail));
        }
        let _ = writeln!(body, "<span>{}</span>", escape_html(&entry.title));
        let _ = writeln!(
            body,
            "<a href=\"{}\">Video</a> <a href=\"{}\">Thumbnail</a>",
            escape_html(&video_link(&entry.video_id, HIGHEST)),
            escape_html(&thumbnail_link(&entry.video_id))
        );
        body.push_str("</div>\n");
    }

    body.push_str("<button type=\"submit\" name=\"action\" value=\"videos\">Download selected videos (zip)</button>\n");
    body.push_str("<button type=\"submit\" name=\"action\" value=\"thumbnails\">Download selected thumbnails (zip)</button>\n");
    body.push_str("</form>\n");
    layout(&body)
}
