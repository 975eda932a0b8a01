//! Required-title rule commands - list, add, remove, copy and clear.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, choices::ReligionChoice, handlers::autocomplete, say_long},
        core::rules::{self, CopyMode, NewRule},
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parent command for required-title rules.
    #[poise::command(
        slash_command,
        subcommands("rules_list", "rules_add", "rules_remove", "rules_copy", "rules_clear")
    )]
    pub async fn rules(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Rule commands. Available subcommands:\n\
            `/rules list` - Show the rules of a class\n\
            `/rules add` - Require a title in a class\n\
            `/rules remove` - Delete a rule by id\n\
            `/rules copy` - Copy the rules of one class to another\n\
            `/rules clear` - Delete all rules of a class";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows the rules of a class.
    #[poise::command(slash_command, rename = "list")]
    pub async fn rules_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
    ) -> Result<()> {
        let class_rules = rules::rules_for_class(&ctx.data().database, &class_id).await?;
        if class_rules.is_empty() {
            ctx.say(format!("Class {} has no rules.", class_id.trim()))
                .await?;
            return Ok(());
        }

        let mut text = format!("**Rules of class {}**\n", class_id.trim());
        for rule in &class_rules {
            let track = match rule.applies_to_gu {
                Some(true) => "GU only",
                Some(false) => "regular only",
                None => "all tracks",
            };
            writeln!(
                &mut text,
                "• #{} {} ({}) - {track}, religion {}, course {}",
                rule.req_id,
                rule.title_id,
                rule.subject,
                rule.religion.as_deref().unwrap_or("any"),
                rule.course.as_deref().unwrap_or("any")
            )?;
        }
        say_long(ctx, &text).await
    }

    /// Requires a title for the matching students of a class.
    #[poise::command(slash_command, rename = "add")]
    pub async fn rules_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
        #[description = "Title id"]
        #[autocomplete = "autocomplete::autocomplete_title_id"]
        title_id: String,
        #[description = "Subject (default: the title's subject)"] subject: Option<String>,
        #[description = "true = GU students only, false = regular track only"] gu: Option<bool>,
        #[description = "Only students of this religion class"] religion: Option<ReligionChoice>,
        #[description = "Only students of this course"] course: Option<String>,
    ) -> Result<()> {
        let rule = NewRule {
            class_id,
            title_id,
            subject,
            applies_to_gu: gu,
            religion: religion.map(Into::into),
            course,
        };
        let rule = rules::add_rule(&ctx.data().database, rule).await?;
        ctx.say(format!(
            "✅ Rule #{} added: class {} needs {}.",
            rule.req_id, rule.class_id, rule.title_id
        ))
        .await?;
        Ok(())
    }

    /// Deletes a rule by its id.
    #[poise::command(slash_command, rename = "remove")]
    pub async fn rules_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Rule id from /rules list"] rule_id: i64,
    ) -> Result<()> {
        let rule = rules::remove_rule(&ctx.data().database, rule_id).await?;
        ctx.say(format!(
            "🗑️ Rule #{} ({} in class {}) removed.",
            rule.req_id, rule.title_id, rule.class_id
        ))
        .await?;
        Ok(())
    }

    /// Copies the rules of one class to another. Identical rules are skipped.
    #[poise::command(slash_command, rename = "copy")]
    pub async fn rules_copy(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Copy from class"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        from_class: String,
        #[description = "Copy to class"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        to_class: String,
        #[description = "Insert duplicates too (default: skip existing rules)"] append: Option<
            bool,
        >,
    ) -> Result<()> {
        let mode = if append.unwrap_or(false) {
            CopyMode::Append
        } else {
            CopyMode::Merge
        };
        let outcome =
            rules::copy_rules(&ctx.data().database, &from_class, &to_class, mode).await?;
        ctx.say(format!(
            "✅ Copied rules {} -> {}: {} added, {} already present.",
            from_class.trim(),
            to_class.trim(),
            outcome.inserted,
            outcome.skipped
        ))
        .await?;
        Ok(())
    }

    /// Deletes all rules of a class. Requires typing `DELETE <class>`.
    #[poise::command(slash_command, rename = "clear")]
    pub async fn rules_clear(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
        #[description = "Type DELETE followed by the class id"] confirmation: Option<String>,
    ) -> Result<()> {
        let Some(confirmation) = confirmation else {
            ctx.say(format!(
                "⚠️ This deletes every rule of class {}. Repeat with confirmation `{}`.",
                class_id.trim(),
                rules::clear_confirmation_phrase(&class_id)
            ))
            .await?;
            return Ok(());
        };

        let deleted = rules::clear_rules(&ctx.data().database, &class_id, &confirmation).await?;
        ctx.say(format!(
            "🗑️ Deleted {deleted} rules of class {}.",
            class_id.trim()
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
