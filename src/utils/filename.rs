use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ILLEGAL_FILENAME_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).unwrap();
}

const FALLBACK_NAME: &str = "download";

/// Replaces characters that common filesystems reject with a hyphen.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = ILLEGAL_FILENAME_CHARS.replace_all(name, "-");
    if sanitized.trim().is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized.into_owned()
    }
}

/// Builds an `attachment` disposition. The quoted `filename` is an ASCII
/// fallback; `filename*` carries the real UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let filename = sanitize_filename(filename);
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();

    if ascii == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(&filename)
        )
    }
}

/// Returns `name` unchanged the first time, then `stem (2).ext`, `stem (3).ext`...
pub fn disambiguate(name: &str, taken: &mut std::collections::HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };

    let mut counter = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, counter, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}
