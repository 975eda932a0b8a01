//! Incident commands - report lost or damaged books and list recorded incidents.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            choices::{ChargeChoice, IssueChoice, PaymentChoice},
            say_long,
        },
        core::{
            incident::{self, IncidentLine},
            model::PaymentMode,
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    const DEFAULT_LIST_LIMIT: u64 = 20;

    /// Parent command for incidents.
    #[poise::command(slash_command, subcommands("incident_report", "incident_list"))]
    pub async fn incident(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Incident commands. Available subcommands:\n\
            `/incident report` - Record lost or damaged books for a student\n\
            `/incident list` - Show recorded incidents";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Records one incident per scanned copy (comma separated) and prints a receipt.
    ///
    /// Without scans a single incident without a copy is recorded. The copies stay
    /// with their holder; return them with `/book storage` if needed.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, rename = "report")]
    pub async fn incident_report(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student id"] student_id: String,
        #[description = "What happened"] issue: IssueChoice,
        #[description = "Scanned book codes, comma separated"] scans: Option<String>,
        #[description = "How to charge (default: full price for lost/missing, open for damage)"]
        charge: Option<ChargeChoice>,
        #[description = "Amount for a custom charge"] custom_amount: Option<f64>,
        #[description = "Payment mode"] payment: Option<PaymentChoice>,
        #[description = "Optional note"] note: Option<String>,
    ) -> Result<()> {
        let charge = match charge {
            Some(choice) => {
                let Some(charge) = choice.into_charge(custom_amount) else {
                    ctx.say("❌ A custom charge needs `custom_amount`.").await?;
                    return Ok(());
                };
                Some(charge)
            }
            None => None,
        };

        let scans: Vec<Option<String>> = match scans.as_deref() {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Some(s.to_string()))
                .collect(),
            None => Vec::new(),
        };
        let scans = if scans.is_empty() { vec![None] } else { scans };

        let lines = scans
            .into_iter()
            .map(|scan| IncidentLine {
                scan,
                issue_type: issue.into(),
                charge,
                note: note.clone(),
            })
            .collect();

        let data = ctx.data();
        let receipt = incident::report_incidents(
            &data.database,
            &data.config.fees,
            &student_id,
            lines,
            payment.map_or(PaymentMode::Unknown, Into::into),
        )
        .await?;

        say_long(ctx, &format!("🧾 {receipt}")).await
    }

    /// Lists incidents of a student, or the most recent ones.
    #[poise::command(slash_command, rename = "list")]
    pub async fn incident_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student id (default: all students)"] student_id: Option<String>,
        #[description = "How many recent incidents to show (default 20)"] limit: Option<u64>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let records = match &student_id {
            Some(id) => incident::incidents_for_student(db, id).await?,
            None => incident::recent_incidents(db, limit.unwrap_or(DEFAULT_LIST_LIMIT)).await?,
        };

        if records.is_empty() {
            ctx.say("No incidents recorded.").await?;
            return Ok(());
        }

        let mut text = String::from("**Incidents**\n");
        for record in &records {
            let amount = record
                .amount
                .map_or_else(|| "open".to_string(), |a| format!("{a:.2}"));
            writeln!(
                &mut text,
                "• #{} {} {} {} `{}` {} ({}, {})",
                record.id,
                record.created_at.format("%Y-%m-%d"),
                record.student_id,
                record.issue_type,
                record.book_code.as_deref().unwrap_or("-"),
                amount,
                record.condition_detail,
                record.payment_mode
            )?;
        }
        say_long(ctx, &text).await
    }
}

// Re-export all commands
pub use inner::*;
