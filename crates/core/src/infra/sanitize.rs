/// フォルダ名・ファイル名に使えない文字
const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// フォルダ名の正規化: 禁止文字 → `_`、前後の空白とドット除去、連続する空白と `_` の圧縮
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    collapse_repeats(trimmed)
}

/// ファイル名の正規化。`%` 変数（Image Saver 用）はそのまま残る。
pub fn sanitize_filename(name: &str) -> String {
    sanitize_component(name)
}

fn collapse_repeats(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev: Option<char> = None;

    for ch in s.chars() {
        if (ch == ' ' || ch == '_') && prev == Some(ch) {
            continue;
        }
        result.push(ch);
        prev = Some(ch);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_chars() {
        assert_eq!(sanitize_component("a<b>c:d"), "a_b_c_d");
        assert_eq!(sanitize_component("what?*"), "what_");
        assert_eq!(sanitize_component("dir/sub\\x"), "dir_sub_x");
    }

    #[test]
    fn test_trim_spaces_and_dots() {
        assert_eq!(sanitize_component("  ..name.. "), "name");
        assert_eq!(sanitize_component("..."), "");
    }

    #[test]
    fn test_collapse() {
        assert_eq!(sanitize_component("a    b"), "a b");
        assert_eq!(sanitize_component("a__|__b"), "a_b");
    }

    #[test]
    fn test_filename_keeps_percent_vars() {
        assert_eq!(sanitize_filename("%seed_%counter"), "%seed_%counter");
        assert_eq!(sanitize_filename(" img:%time. "), "img_%time");
    }
}
