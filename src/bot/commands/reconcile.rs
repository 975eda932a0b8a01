//! Reconciliation commands - Soll/Ist per class or student and the missing list.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, say_long},
        core::reconcile::{self, ReconciliationRow},
        errors::{Error, Result},
    };
    use std::fmt::Write;

    fn format_rows(heading: &str, rows: &[ReconciliationRow]) -> Result<String> {
        let mut text = format!("**{heading}**\n");
        if rows.is_empty() {
            text.push_str("No required or held titles.");
            return Ok(text);
        }
        text.push_str("```\nTitle            Should   Is  Missing  Extra\n");
        for row in rows {
            writeln!(
                &mut text,
                "{:<16} {:>6} {:>4} {:>8} {:>6}",
                row.title_id, row.cnt_should, row.cnt_is, row.cnt_missing, row.cnt_extra
            )?;
        }
        let sum = reconcile::totals(rows);
        writeln!(
            &mut text,
            "{:<16} {:>6} {:>4} {:>8} {:>6}\n```",
            "Total", sum.cnt_should, sum.cnt_is, sum.cnt_missing, sum.cnt_extra
        )?;
        Ok(text)
    }

    /// Parent command for reconciliation.
    #[poise::command(
        slash_command,
        subcommands(
            "reconcile_class",
            "reconcile_student",
            "reconcile_missing",
            "reconcile_assign_next"
        )
    )]
    pub async fn reconcile(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Reconciliation commands. Available subcommands:\n\
            `/reconcile class` - Soll/Ist per title for a class\n\
            `/reconcile student` - Soll/Ist per title for a student\n\
            `/reconcile missing` - Students still missing a title\n\
            `/reconcile assign_next` - Give a copy to the next student without one";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Soll/Ist per title for the active students of a class.
    #[poise::command(slash_command, rename = "class")]
    pub async fn reconcile_class(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
    ) -> Result<()> {
        let rows = reconcile::class_reconciliation(&ctx.data().database, &class_id).await?;
        let text = format_rows(&format!("Class {}", class_id.trim()), &rows)?;
        say_long(ctx, &text).await
    }

    /// Soll/Ist per title for one student.
    #[poise::command(slash_command, rename = "student")]
    pub async fn reconcile_student(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student id"] student_id: String,
    ) -> Result<()> {
        let rows = reconcile::student_reconciliation(&ctx.data().database, &student_id).await?;
        let text = format_rows(&format!("Student {}", student_id.trim()), &rows)?;
        say_long(ctx, &text).await
    }

    /// Lists the students of a class who need a title but hold no copy.
    #[poise::command(slash_command, rename = "missing")]
    pub async fn reconcile_missing(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
        #[description = "Title id"]
        #[autocomplete = "autocomplete::autocomplete_title_id"]
        title_id: String,
    ) -> Result<()> {
        let missing =
            reconcile::missing_students_for_title(&ctx.data().database, &class_id, &title_id)
                .await?;
        if missing.is_empty() {
            ctx.say(format!("✅ Every student of {} has {title_id}.", class_id.trim()))
                .await?;
            return Ok(());
        }
        let mut text = format!(
            "**{} students of {} are missing {title_id}:**\n",
            missing.len(),
            class_id.trim()
        );
        for student_id in &missing {
            writeln!(&mut text, "• {student_id}")?;
        }
        say_long(ctx, &text).await
    }

    /// Gives a scanned copy to the first student of the class without one.
    #[poise::command(slash_command, rename = "assign_next")]
    pub async fn reconcile_assign_next(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
        #[description = "Title id"]
        #[autocomplete = "autocomplete::autocomplete_title_id"]
        title_id: String,
        #[description = "Scanned book code"] scan: String,
    ) -> Result<()> {
        let confirmation =
            reconcile::assign_next_missing(&ctx.data().database, &class_id, &title_id, &scan)
                .await?;
        ctx.say(format!("✅ {confirmation}")).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
