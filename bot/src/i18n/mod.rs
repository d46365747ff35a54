//! Localized bot texts.
//!
//! Strings live in `locales/<locale>.yml` and are loaded by the
//! `rust_i18n::i18n!` call at the crate root. Placeholders are written as
//! `%{name}` and filled by [`translate`], which HTML-escapes every argument
//! because all bot messages are sent with `ParseMode::Html`.

pub const SUPPORTED_LOCALES: [&str; 2] = ["fa", "en"];

/// The user's stored language when supported, otherwise `fallback`.
pub fn resolve_locale<'a>(language: Option<&'a str>, fallback: &'a str) -> &'a str {
    language
        .filter(|lang| SUPPORTED_LOCALES.contains(lang))
        .unwrap_or(fallback)
}

pub fn translate(locale: &str, key: &str, args: Option<&[(&str, &str)]>) -> String {
    let text = rust_i18n::t!(key, locale = locale).to_string();
    let Some(args) = args else {
        return text;
    };
    args.iter().fold(text, |acc, (name, value)| {
        acc.replace(&format!("%{{{}}}", name), &escape_html(value))
    })
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_locale() {
        assert_eq!(resolve_locale(Some("en"), "fa"), "en");
        assert_eq!(resolve_locale(Some("de"), "fa"), "fa");
        assert_eq!(resolve_locale(None, "en"), "en");
    }

    #[test]
    fn test_translate_fills_and_escapes_arguments() {
        let text = translate("en", "awaiting_chart_for", Some(&[("symbol", "<XAUUSD>")]));
        assert!(text.contains("&lt;XAUUSD&gt;"));
        assert!(!text.contains("%{symbol}"));
    }

    #[test]
    fn test_locales_differ() {
        assert_ne!(
            translate("en", "menu_signal", None),
            translate("fa", "menu_signal", None)
        );
    }
}
