//! Inline keyboards.

use shared::AssetCategory;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::i18n::translate;

const SYMBOLS_PER_ROW: usize = 3;

fn button(locale: &str, key: &str, data: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(translate(locale, key, None), data)
}

pub fn main_menu(locale: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(locale, "menu_signal", "menu:signal")],
        vec![
            button(locale, "menu_profile", "menu:profile"),
            button(locale, "menu_referral", "menu:referral"),
        ],
        vec![
            button(locale, "menu_wallet", "menu:wallet"),
            button(locale, "menu_support", "menu:support"),
        ],
    ])
}

pub fn categories_menu(locale: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = AssetCategory::ALL
        .iter()
        .map(|category| {
            vec![button(
                locale,
                &format!("category_{}", category.as_str()),
                format!("cat:{}", category),
            )]
        })
        .collect();
    rows.push(vec![button(locale, "button_back", "menu:home")]);
    InlineKeyboardMarkup::new(rows)
}

pub fn symbols_menu(locale: &str, category: AssetCategory) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = category
        .symbols()
        .chunks(SYMBOLS_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|symbol| {
                    InlineKeyboardButton::callback(symbol.to_string(), format!("sym:{}:{}", category, symbol))
                })
                .collect()
        })
        .collect();
    rows.push(vec![button(locale, "button_back", "menu:signal")]);
    InlineKeyboardMarkup::new(rows)
}

pub fn asset_action_menu(locale: &str, category: AssetCategory, symbol: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(locale, "action_chart", format!("act:chart:{}:{}", category, symbol))],
        vec![button(locale, "action_prompt", format!("act:prompt:{}:{}", category, symbol))],
        vec![button(locale, "action_news", format!("act:news:{}:{}", category, symbol))],
        vec![button(locale, "button_back", format!("cat:{}", category))],
    ])
}

/// Shown when the quota is exhausted.
pub fn top_up_menu(locale: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(locale, "menu_referral", "menu:referral"),
            button(locale, "menu_wallet", "menu:wallet"),
        ],
        vec![button(locale, "button_home", "menu:home")],
    ])
}
