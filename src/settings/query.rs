//! URL query string → settings layer.

use log::debug;
use percent_encoding::percent_decode_str;

use super::SettingsPatch;

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parse `name=value` pairs (separated by `&`, optional leading `?`) into a
/// patch. Names and values are percent-decoded. Recognized names populate
/// their fields; everything else is kept verbatim in `extra`.
pub fn parse_query(query: &str) -> SettingsPatch {
    let mut patch = SettingsPatch::default();
    let query = query.strip_prefix('?').unwrap_or(query);

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode(name);
        let value = decode(value);

        let flag = match name.as_str() {
            "restore" => Some(&mut patch.restore),
            "reload" => Some(&mut patch.reload),
            "history" => Some(&mut patch.history),
            "generatePagination" => Some(&mut patch.generate_pagination),
            "sidebarReflow" => Some(&mut patch.sidebar_reflow),
            _ => None,
        };
        if let Some(slot) = flag {
            match parse_bool(&value) {
                Some(b) => *slot = Some(b),
                None => {
                    debug!("query: {name}={value} is not a boolean, keeping verbatim");
                    patch.extra.insert(name, value);
                }
            }
            continue;
        }

        match name.as_str() {
            "bookKey" => patch.book_key = Some(value),
            "language" => patch.language = Some(value),
            "previousLocationCfi" => patch.previous_location_cfi = Some(value),
            _ => {
                debug!("query: unrecognized parameter {name}={value}");
                patch.extra.insert(name, value);
            }
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_fields() {
        let p = parse_query("?restore=true&history=false&language=ja&bookKey=k1");
        assert_eq!(p.restore, Some(true));
        assert_eq!(p.history, Some(false));
        assert_eq!(p.language.as_deref(), Some("ja"));
        assert_eq!(p.book_key.as_deref(), Some("k1"));
    }

    #[test]
    fn book_path_is_not_a_query_setting() {
        let p = parse_query("bookPath=a%2Fb.epub");
        assert_eq!(p.book_path, None);
        assert_eq!(p.extra["bookPath"], "a/b.epub");
    }

    #[test]
    fn values_are_percent_decoded() {
        let p = parse_query("previousLocationCfi=epubcfi(%2F6%2F4%5B!ch01%5D)&note=hello+world");
        assert_eq!(
            p.previous_location_cfi.as_deref(),
            Some("epubcfi(/6/4[!ch01])")
        );
        assert_eq!(p.extra["note"], "hello world");
    }

    #[test]
    fn unknown_names_stored_verbatim() {
        let p = parse_query("theme=night&flag");
        assert_eq!(p.extra["theme"], "night");
        assert_eq!(p.extra["flag"], "");
    }

    #[test]
    fn non_boolean_flag_goes_to_extra() {
        let p = parse_query("restore=maybe");
        assert_eq!(p.restore, None);
        assert_eq!(p.extra["restore"], "maybe");
    }

    #[test]
    fn empty_query() {
        assert_eq!(parse_query(""), SettingsPatch::default());
        assert_eq!(parse_query("?"), SettingsPatch::default());
    }
}
