use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 未知のテーマキーのフォールバック先
pub const FALLBACK_THEME: &str = "umbrael";

/// ウィジェットの配色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    pub primary: String,
    pub primary_light: String,
    pub primary_dark: String,
    pub gradient: String,
    pub accent: String,
    pub secondary: String,
    pub background: String,
}

/// カスタムテーマに必須のキー
pub const THEME_KEYS: [&str; 8] = [
    "name",
    "primary",
    "primaryLight",
    "primaryDark",
    "gradient",
    "accent",
    "secondary",
    "background",
];

// (key, name, primary, primaryLight, primaryDark, gradient, accent, secondary, background)
type ThemeRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const BUILTIN: [ThemeRow; 7] = [
    (
        "ocean",
        "Ocean Blue",
        "#4299e1",
        "rgba(66, 153, 225, 0.3)",
        "rgba(66, 153, 225, 0.6)",
        "linear-gradient(135deg, rgba(66, 153, 225, 0.2), rgba(20, 184, 166, 0.1))",
        "#14b8a6",
        "#60a5fa",
        "linear-gradient(180deg, rgba(10, 30, 50, 0.5) 0%, rgba(20, 60, 80, 0.3) 100%)",
    ),
    (
        "forest",
        "Forest Green",
        "#10b981",
        "rgba(16, 185, 129, 0.3)",
        "rgba(16, 185, 129, 0.6)",
        "linear-gradient(135deg, rgba(16, 185, 129, 0.2), rgba(217, 119, 6, 0.1))",
        "#d97706",
        "#34d399",
        "linear-gradient(180deg, rgba(10, 30, 20, 0.5) 0%, rgba(30, 50, 30, 0.3) 100%)",
    ),
    (
        "pinkpony",
        "Pink Pony Club",
        "#ec4899",
        "rgba(236, 72, 153, 0.3)",
        "rgba(236, 72, 153, 0.6)",
        "linear-gradient(135deg, rgba(236, 72, 153, 0.2), rgba(255, 255, 255, 0.15))",
        "#ffffff",
        "#f472b6",
        "linear-gradient(180deg, rgba(50, 20, 40, 0.5) 0%, rgba(80, 30, 60, 0.3) 100%)",
    ),
    (
        "odie",
        "Odie",
        "#f97316",
        "rgba(249, 115, 22, 0.3)",
        "rgba(249, 115, 22, 0.6)",
        "linear-gradient(135deg, rgba(249, 115, 22, 0.2), rgba(212, 165, 116, 0.15))",
        "#d4a574",
        "#fb923c",
        "linear-gradient(180deg, rgba(40, 25, 15, 0.5) 0%, rgba(60, 40, 25, 0.3) 100%)",
    ),
    (
        "umbrael",
        "Umbrael's Umbrage",
        "#9333ea",
        "rgba(147, 51, 234, 0.3)",
        "rgba(147, 51, 234, 0.6)",
        "linear-gradient(135deg, rgba(168, 85, 247, 0.2), rgba(251, 191, 36, 0.1))",
        "#fbbf24",
        "#a855f7",
        "linear-gradient(180deg, rgba(17, 24, 39, 0.6) 0%, rgba(30, 20, 50, 0.4) 100%)",
    ),
    (
        "plainjane",
        "Plain Jane",
        "#6b7280",
        "rgba(107, 114, 128, 0.3)",
        "rgba(107, 114, 128, 0.6)",
        "linear-gradient(135deg, rgba(107, 114, 128, 0.15), rgba(156, 163, 175, 0.1))",
        "#9ca3af",
        "#4b5563",
        "linear-gradient(180deg, rgba(30, 30, 35, 0.5) 0%, rgba(40, 40, 45, 0.3) 100%)",
    ),
    (
        "batman",
        "The Dark Knight",
        "#1a1a1a",
        "rgba(26, 26, 26, 0.5)",
        "rgba(0, 0, 0, 0.8)",
        "linear-gradient(135deg, rgba(0, 0, 0, 0.6), rgba(255, 204, 0, 0.05))",
        "#ffcc00",
        "#333333",
        "linear-gradient(180deg, rgba(0, 0, 0, 0.8) 0%, rgba(15, 15, 8, 0.6) 100%)",
    ),
];

fn from_row(row: &ThemeRow) -> Theme {
    let (_, name, primary, light, dark, gradient, accent, secondary, background) = *row;
    Theme {
        name: name.to_string(),
        primary: primary.to_string(),
        primary_light: light.to_string(),
        primary_dark: dark.to_string(),
        gradient: gradient.to_string(),
        accent: accent.to_string(),
        secondary: secondary.to_string(),
        background: background.to_string(),
    }
}

/// 組み込みテーマのキー（表示順）
pub fn builtin_theme_keys() -> Vec<&'static str> {
    BUILTIN.iter().map(|row| row.0).collect()
}

pub fn builtin_theme(key: &str) -> Option<Theme> {
    BUILTIN.iter().find(|row| row.0 == key).map(from_row)
}

/// 全キーが文字列であるか
pub fn is_valid_theme_value(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    THEME_KEYS
        .iter()
        .all(|key| obj.get(*key).is_some_and(Value::is_string))
}

/// カスタムテーマ群を読み込む。不正なエントリは警告して捨てる。
pub fn parse_custom_themes(value: &Value) -> BTreeMap<String, Theme> {
    let mut themes = BTreeMap::new();
    let Some(obj) = value.as_object() else {
        if !value.is_null() {
            log::warn!("カスタムテーマが object ではありません");
        }
        return themes;
    };
    for (key, raw) in obj {
        if !is_valid_theme_value(raw) {
            log::warn!("不正なカスタムテーマ \"{key}\" をスキップ");
            continue;
        }
        match serde_json::from_value::<Theme>(raw.clone()) {
            Ok(theme) => {
                themes.insert(key.clone(), theme);
            }
            Err(e) => log::warn!("カスタムテーマ \"{key}\" の読み込み失敗: {e}"),
        }
    }
    themes
}

/// キーからテーマを解決する（組み込み → カスタム → umbrael）
pub fn resolve_theme(key: &str, custom: &BTreeMap<String, Theme>) -> Theme {
    if let Some(theme) = builtin_theme(key) {
        return theme;
    }
    if let Some(theme) = custom.get(key) {
        return theme.clone();
    }
    log::debug!("未知のテーマ \"{key}\"、{FALLBACK_THEME} を使用");
    BUILTIN
        .iter()
        .find(|row| row.0 == FALLBACK_THEME)
        .map(from_row)
        .unwrap_or_else(|| from_row(&BUILTIN[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seven_builtins() {
        assert_eq!(
            builtin_theme_keys(),
            vec!["ocean", "forest", "pinkpony", "odie", "umbrael", "plainjane", "batman"]
        );
        assert_eq!(builtin_theme("batman").unwrap().accent, "#ffcc00");
    }

    #[test]
    fn test_unknown_falls_back_to_umbrael() {
        let theme = resolve_theme("nope", &BTreeMap::new());
        assert_eq!(theme.name, "Umbrael's Umbrage");
    }

    #[test]
    fn test_custom_theme_validation() {
        let good = json!({
            "name": "Mint", "primary": "#0f0", "primaryLight": "a", "primaryDark": "b",
            "gradient": "c", "accent": "d", "secondary": "e", "background": "f"
        });
        let value = json!({
            "mint": good,
            "broken": { "name": "Half", "primary": "#000" },
            "wrongtype": { "name": 1, "primary": "#0f0", "primaryLight": "a", "primaryDark": "b",
                "gradient": "c", "accent": "d", "secondary": "e", "background": "f" }
        });
        let themes = parse_custom_themes(&value);
        assert_eq!(themes.len(), 1);
        assert_eq!(themes["mint"].primary_light, "a");
        assert_eq!(resolve_theme("mint", &themes).name, "Mint");
    }

    #[test]
    fn test_builtin_wins_over_custom_with_same_key() {
        let mut custom = BTreeMap::new();
        let mut fake = builtin_theme("odie").unwrap();
        fake.name = "Impostor".into();
        custom.insert("ocean".to_string(), fake);
        assert_eq!(resolve_theme("ocean", &custom).name, "Ocean Blue");
    }
}
