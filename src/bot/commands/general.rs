//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and operator assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Schoolbook Help**\n\
        **Copies**\n\
        • `/book assign <scan> <holder> [id]` - Gives a copy to a student, teacher or storage.\n\
        • `/book storage <scan>` - Returns a copy to storage.\n\
        • `/book held <holder> [id]` - Lists the copies someone holds.\n\
        • `/book info <scan>` / `/book history <scan>` - Shows a copy and its holders.\n\n\
        **Reconciliation**\n\
        • `/reconcile class <class>` / `/reconcile student <id>` - Soll/Ist per title.\n\
        • `/reconcile missing <class> <title>` - Students still missing a title.\n\
        • `/reconcile assign_next <class> <title> <scan>` - Gives the copy to the next student without one.\n\n\
        **Incidents**\n\
        • `/incident report <student> ...` - Records lost or damaged books and prints a receipt.\n\
        • `/incident list [student]` - Shows recorded incidents.\n\n\
        **Administration**\n\
        • `/title register|search|summary` - Catalog and copy registration.\n\
        • `/rules list|add|remove|copy|clear` - Required titles per class.\n\
        • `/student ensure|update|active|show` and `/teacher save|active|list` - People.\n\
        • `/promote preview` / `/promote commit <phrase>` - End-of-year class promotion.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
