//! Copy commands - assign, return to storage, list by holder, and history.
//!
//! Every change goes through the holder registry, so a copy always has exactly one
//! holder and each move leaves a history row.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            choices::{ConditionChoice, HolderChoice},
            say_long,
        },
        core::{
            catalog,
            holder::{self, AssignBook},
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parent command for copy handling.
    #[poise::command(
        slash_command,
        subcommands("book_assign", "book_storage", "book_held", "book_info", "book_history")
    )]
    pub async fn book(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Copy commands. Available subcommands:\n\
            `/book assign` - Give a copy to a student, teacher or storage\n\
            `/book storage` - Return a copy to storage\n\
            `/book held` - List the copies of a holder\n\
            `/book info` - Show a copy\n\
            `/book history` - Show the holders of a copy";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Gives a scanned copy to a new holder.
    #[poise::command(slash_command, rename = "assign")]
    pub async fn book_assign(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Scanned book code"] scan: String,
        #[description = "Who receives the copy"] holder: HolderChoice,
        #[description = "Student or teacher id (not needed for storage)"] holder_id: Option<
            String,
        >,
        #[description = "Condition of the copy now"] condition: Option<ConditionChoice>,
        #[description = "Optional note"] note: Option<String>,
        #[description = "Revision you saw; the assignment fails if the copy changed since"]
        expected_revision: Option<i64>,
    ) -> Result<()> {
        let Some(holder) = holder.with_id(holder_id) else {
            ctx.say("❌ Please give the student or teacher id.").await?;
            return Ok(());
        };

        let mut request = AssignBook::new(scan, holder);
        request.condition = condition.map(Into::into);
        request.note = note;
        request.expected_revision = expected_revision;

        let confirmation = holder::assign_book(&ctx.data().database, request).await?;
        ctx.say(format!("✅ {confirmation}")).await?;
        Ok(())
    }

    /// Returns a scanned copy to storage.
    #[poise::command(slash_command, rename = "storage")]
    pub async fn book_storage(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Scanned book code"] scan: String,
        #[description = "Optional note"] note: Option<String>,
    ) -> Result<()> {
        let confirmation = holder::return_to_storage(&ctx.data().database, &scan, note).await?;
        ctx.say(format!("📦 {confirmation}")).await?;
        Ok(())
    }

    /// Lists the copies currently held by a student, a teacher or storage.
    #[poise::command(slash_command, rename = "held")]
    pub async fn book_held(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Holder kind"] holder: HolderChoice,
        #[description = "Student or teacher id (not needed for storage)"] holder_id: Option<
            String,
        >,
    ) -> Result<()> {
        let Some(holder) = holder.with_id(holder_id.map(|id| id.trim().to_string())) else {
            ctx.say("❌ Please give the student or teacher id.").await?;
            return Ok(());
        };

        let copies = holder::list_by_holder(&ctx.data().database, &holder).await?;
        if copies.is_empty() {
            ctx.say(format!("{holder} holds no copies.")).await?;
            return Ok(());
        }

        let mut text = format!("**{holder}** holds {} copies:\n", copies.len());
        for copy in &copies {
            writeln!(
                &mut text,
                "• `{}` {} ({}, rev {})",
                copy.book_code, copy.title_id, copy.condition, copy.revision
            )?;
        }
        say_long(ctx, &text).await
    }

    /// Shows a copy with its title and current holder.
    #[poise::command(slash_command, rename = "info")]
    pub async fn book_info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Scanned book code"] scan: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let copy = catalog::require_book(db, &scan).await?;
        let title = catalog::require_title(db, &copy.title_id).await?;
        let current = holder::holder_of(&copy)?;

        let text = format!(
            "**{}** - {} ({})\nTitle: {} [{}], price {:.2}\nHolder: {current}\nStatus: {}, condition: {}, revision {}",
            copy.book_code,
            title.title_name,
            title.subject,
            title.title_id,
            title.isbn.as_deref().unwrap_or("no ISBN"),
            title.price,
            copy.status,
            copy.condition,
            copy.revision
        );
        ctx.say(text).await?;
        Ok(())
    }

    /// Shows every holder a copy has had, oldest first.
    #[poise::command(slash_command, rename = "history")]
    pub async fn book_history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Scanned book code"] scan: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let copy = catalog::require_book(db, &scan).await?;
        let history = holder::assignment_history(db, &copy.book_code).await?;

        let mut text = format!("**History of {}**\n", copy.book_code);
        for entry in &history {
            write!(
                &mut text,
                "• rev {} {} {}: {} ({})",
                entry.revision,
                entry.assigned_at.format("%Y-%m-%d %H:%M"),
                entry.holder_type,
                entry.holder_id.as_deref().unwrap_or("-"),
                entry.condition
            )?;
            if let Some(note) = &entry.note {
                write!(&mut text, " - {note}")?;
            }
            text.push('\n');
        }
        say_long(ctx, &text).await
    }
}

// Re-export all commands
pub use inner::*;
