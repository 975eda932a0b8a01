//! Title commands - register titles with their copies, search, and the location summary.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, choices::ConditionChoice, say_long},
        core::{
            catalog::{self, NewTitle, RegisterCopies},
            model::{Condition, CopyStatus},
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parent command for the title catalog.
    #[poise::command(
        slash_command,
        subcommands("title_register", "title_search", "title_summary")
    )]
    pub async fn title(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Title commands. Available subcommands:\n\
            `/title register` - Create or update a title and register copies\n\
            `/title search` - Find titles\n\
            `/title summary` - Where the copies of each title are";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates or updates a title and registers copy codes (comma separated).
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, rename = "register")]
    pub async fn title_register(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Title id (e.g. BIO_7)"] title_id: String,
        #[description = "Subject"] subject: String,
        #[description = "Title name"] title_name: String,
        #[description = "Replacement price"] price: f64,
        #[description = "Book codes, comma separated"] codes: Option<String>,
        #[description = "ISBN"] isbn: Option<String>,
        #[description = "Condition of the new copies (default ok)"] condition: Option<
            ConditionChoice,
        >,
        #[description = "Also move already registered copies back to storage"]
        put_into_storage: Option<bool>,
    ) -> Result<()> {
        let book_codes = codes
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        let request = RegisterCopies {
            title: NewTitle {
                title_id,
                subject,
                title_name,
                isbn,
                price,
            },
            book_codes,
            condition: condition.map_or(Condition::Ok, Into::into),
            status: CopyStatus::Ok,
            put_into_storage: put_into_storage.unwrap_or(false),
        };
        let outcome = catalog::register_title_with_books(&ctx.data().database, request).await?;

        let mut text = format!(
            "✅ **{}** {} ({}, {:.2})\n",
            outcome.title.title_id,
            outcome.title.title_name,
            outcome.title.subject,
            outcome.title.price
        );
        writeln!(&mut text, "New copies: {}", outcome.created.len())?;
        if !outcome.existing.is_empty() {
            writeln!(
                &mut text,
                "Already registered: {}",
                outcome.existing.join(", ")
            )?;
        }
        if !outcome.returned_to_storage.is_empty() {
            writeln!(
                &mut text,
                "Returned to storage: {}",
                outcome.returned_to_storage.join(", ")
            )?;
        }
        say_long(ctx, &text).await
    }

    /// Searches titles by id, name, subject or ISBN.
    #[poise::command(slash_command, rename = "search")]
    pub async fn title_search(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Search text"] query: String,
    ) -> Result<()> {
        let titles = catalog::search_titles(&ctx.data().database, &query).await?;
        if titles.is_empty() {
            ctx.say("No titles found.").await?;
            return Ok(());
        }

        let mut text = format!("**{} titles**\n", titles.len());
        for t in &titles {
            writeln!(
                &mut text,
                "• {} - {} ({}) {:.2}",
                t.title_id, t.title_name, t.subject, t.price
            )?;
        }
        say_long(ctx, &text).await
    }

    /// Shows how many copies of each title are with students, teachers and in storage.
    #[poise::command(slash_command, rename = "summary")]
    pub async fn title_summary(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let rows = catalog::title_location_summary(&ctx.data().database).await?;
        if rows.is_empty() {
            ctx.say("The catalog is empty.").await?;
            return Ok(());
        }

        let mut text =
            String::from("```\nTitle            Students Teachers Storage  Total\n");
        for row in &rows {
            writeln!(
                &mut text,
                "{:<16} {:>8} {:>8} {:>7} {:>6}",
                row.title_id, row.cnt_students, row.cnt_teachers, row.cnt_storage, row.cnt_total
            )?;
        }
        text.push_str("```");
        say_long(ctx, &text).await
    }
}

// Re-export all commands
pub use inner::*;
