//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests class ids and title ids as the operator types.

use crate::{
    bot::BotData,
    core::{catalog, people},
    errors::Error,
};

/// Discord shows at most 25 suggestions.
const MAX_SUGGESTIONS: usize = 25;

/// Provides autocomplete suggestions for class ids known from students or rules.
pub async fn autocomplete_class_id(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;
    let Ok(classes) = people::list_class_ids(db).await else {
        return Vec::new();
    };

    let partial_lower = partial.trim().to_lowercase();
    classes
        .into_iter()
        .filter(|class_id| class_id.starts_with(&partial_lower))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Provides autocomplete suggestions for title ids.
///
/// Matches the same fields as `/title search` (id, name, subject, ISBN).
pub async fn autocomplete_title_id(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;
    let Ok(titles) = catalog::search_titles(db, partial).await else {
        return Vec::new();
    };

    let mut matching: Vec<String> = titles
        .into_iter()
        .map(|t| t.title_id)
        .take(MAX_SUGGESTIONS)
        .collect();
    matching.sort();
    matching
}
