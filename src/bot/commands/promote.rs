//! Promotion commands - preview and commit the end-of-year class promotion.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, say_long},
        core::promotion::{self, PromotionRow},
        errors::{Error, Result},
    };
    use std::fmt::Write;

    fn format_rows(rows: &[PromotionRow]) -> Result<String> {
        let mut text = String::new();
        for row in rows {
            writeln!(
                &mut text,
                "• {} -> {}: {} students",
                row.old_class_id, row.new_class_id, row.student_count
            )?;
        }
        Ok(text)
    }

    /// Parent command for the class promotion.
    #[poise::command(slash_command, subcommands("promote_preview", "promote_commit"))]
    pub async fn promote(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Promotion commands. Available subcommands:\n\
            `/promote preview` - Show which classes would move\n\
            `/promote commit` - Move all students (needs the confirmation phrase)";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows the promotion without changing anything.
    #[poise::command(slash_command, rename = "preview")]
    pub async fn promote_preview(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        if data.promotion.is_empty() {
            ctx.say("⚠️ No successor classes configured in `[promotion.successors]`.")
                .await?;
            return Ok(());
        }

        let report = promotion::promote_classes(
            &data.database,
            &data.promotion,
            true,
            None,
            &data.config.promotion.confirmation_phrase,
        )
        .await?;

        let mut text = String::from("**Promotion preview**\n");
        if report.rows.is_empty() {
            text.push_str("No active students in a class with a successor.\n");
        } else {
            text.push_str(&format_rows(&report.rows)?);
        }
        match promotion::last_promotion(&data.database).await? {
            Some(date) => writeln!(&mut text, "Last promotion: {date}")?,
            None => text.push_str("No promotion committed yet.\n"),
        }
        write!(
            &mut text,
            "Commit with `/promote commit {}`.",
            data.config.promotion.confirmation_phrase
        )?;
        say_long(ctx, &text).await
    }

    /// Moves every active student to the successor class.
    #[poise::command(slash_command, rename = "commit")]
    pub async fn promote_commit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Confirmation phrase"] confirmation: String,
    ) -> Result<()> {
        let data = ctx.data();
        let report = promotion::promote_classes(
            &data.database,
            &data.promotion,
            false,
            Some(&confirmation),
            &data.config.promotion.confirmation_phrase,
        )
        .await?;

        let moved: usize = report.rows.iter().map(|r| r.student_count).sum();
        let text = format!(
            "✅ Promoted {moved} students.\n{}",
            format_rows(&report.rows)?
        );
        say_long(ctx, &text).await
    }
}

// Re-export all commands
pub use inner::*;
