use chrono::NaiveDateTime;

/// 対応するディレクティブ
const DIRECTIVES: [char; 14] = [
    'Y', 'm', 'd', 'H', 'M', 'S', 'y', 'B', 'b', 'A', 'a', 'j', 'U', 'W',
];

/// strftime のサブセットで日時を整形する。
///
/// 未対応のディレクティブはそのまま残し、`%%` は `%` になる。
/// 不正な書式でも失敗しない。
pub fn format_date(format: &str, now: &NaiveDateTime) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(d) if DIRECTIVES.contains(&d) => {
                chars.next();
                out.push_str(&now.format(&format!("%{d}")).to_string());
            }
            _ => out.push('%'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(format_date("%Y-%m-%d", &at(2026, 1, 30, 0, 0, 0)), "2026-01-30");
    }

    #[test]
    fn test_time_and_short_year() {
        let now = at(2026, 3, 5, 7, 8, 9);
        assert_eq!(format_date("%y%m%d_%H%M%S", &now), "260305_070809");
    }

    #[test]
    fn test_names() {
        // 2026-01-30 は金曜日
        let now = at(2026, 1, 30, 12, 0, 0);
        assert_eq!(format_date("%A %a %B %b", &now), "Friday Fri January Jan");
    }

    #[test]
    fn test_day_of_year_and_weeks() {
        let now = at(2026, 1, 30, 0, 0, 0);
        assert_eq!(format_date("%j", &now), "030");
        // 2026-01-01 は木曜日。最初の日曜は 1/4、最初の月曜は 1/5。
        assert_eq!(format_date("%U", &now), "04");
        assert_eq!(format_date("%W", &now), "04");
        assert_eq!(format_date("%U/%W", &at(2026, 1, 3, 0, 0, 0)), "00/00");
    }

    #[test]
    fn test_unknown_and_escaped() {
        let now = at(2026, 1, 30, 0, 0, 0);
        assert_eq!(format_date("%Q-%Y", &now), "%Q-2026");
        assert_eq!(format_date("100%%", &now), "100%");
        assert_eq!(format_date("end%", &now), "end%");
        assert_eq!(format_date("", &now), "");
    }
}
