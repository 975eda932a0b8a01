//! People commands - students and teachers.
//!
//! Students are only ever created here; assigning a book to an unknown student is
//! rejected by the holder registry.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, choices::ReligionChoice, handlers::autocomplete, say_long},
        core::people::{self, NewStudent},
        entities::student,
        errors::{Error, Result},
    };
    use std::fmt::Write;

    fn describe(s: &student::Model) -> String {
        format!(
            "**{}** class {}{}, religion {}, course {}{}",
            s.student_id,
            s.class_id,
            if s.is_gu { " (GU)" } else { "" },
            s.religion.as_deref().unwrap_or("-"),
            s.course.as_deref().unwrap_or("-"),
            if s.active { "" } else { " [inactive]" }
        )
    }

    fn new_student(
        student_id: String,
        class_id: String,
        gu: Option<bool>,
        religion: Option<ReligionChoice>,
        course: Option<String>,
        active: Option<bool>,
    ) -> NewStudent {
        NewStudent {
            student_id,
            class_id,
            is_gu: gu.unwrap_or(false),
            religion: religion.map(Into::into),
            course,
            active: active.unwrap_or(true),
        }
    }

    /// Parent command for students.
    #[poise::command(
        slash_command,
        subcommands("student_ensure", "student_update", "student_active", "student_show")
    )]
    pub async fn student(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Student commands. Available subcommands:\n\
            `/student ensure` - Create a student if it does not exist\n\
            `/student update` - Create or overwrite a student\n\
            `/student active` - Activate or deactivate a student\n\
            `/student show` - Show a student or a class roster";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a student unless it already exists. Existing records stay unchanged.
    #[poise::command(slash_command, rename = "ensure")]
    pub async fn student_ensure(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student id"] student_id: String,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
        #[description = "GU track"] gu: Option<bool>,
        #[description = "Religion class"] religion: Option<ReligionChoice>,
        #[description = "Elective course"] course: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let new = new_student(student_id, class_id, gu, religion, course, None);
        let ensured = people::ensure_student_exists(&data.database, data.config.students, new).await?;

        let prefix = if ensured.created {
            "✅ Created"
        } else {
            "ℹ️ Already exists:"
        };
        ctx.say(format!("{prefix} {}", describe(&ensured.student)))
            .await?;
        Ok(())
    }

    /// Creates a student or overwrites all of its attributes.
    #[poise::command(slash_command, rename = "update")]
    pub async fn student_update(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student id"] student_id: String,
        #[description = "Class id"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: String,
        #[description = "GU track"] gu: Option<bool>,
        #[description = "Religion class"] religion: Option<ReligionChoice>,
        #[description = "Elective course"] course: Option<String>,
        #[description = "Active (default true)"] active: Option<bool>,
    ) -> Result<()> {
        let data = ctx.data();
        let new = new_student(student_id, class_id, gu, religion, course, active);
        let stored = people::upsert_student(&data.database, data.config.students, new).await?;
        ctx.say(format!("✅ Saved {}", describe(&stored))).await?;
        Ok(())
    }

    /// Activates or deactivates a student.
    #[poise::command(slash_command, rename = "active")]
    pub async fn student_active(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student id"] student_id: String,
        #[description = "Active"] active: bool,
    ) -> Result<()> {
        let stored = people::set_student_active(&ctx.data().database, &student_id, active).await?;
        ctx.say(format!("✅ {}", describe(&stored))).await?;
        Ok(())
    }

    /// Shows one student, or the roster of a class.
    #[poise::command(slash_command, rename = "show")]
    pub async fn student_show(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Student id"] student_id: Option<String>,
        #[description = "Class id (shows the whole roster)"]
        #[autocomplete = "autocomplete::autocomplete_class_id"]
        class_id: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        match (student_id, class_id) {
            (Some(id), _) => {
                let s = people::require_student(db, &id).await?;
                ctx.say(describe(&s)).await?;
                Ok(())
            }
            (None, Some(class_id)) => {
                let roster = people::students_in_class(db, &class_id, false).await?;
                if roster.is_empty() {
                    ctx.say(format!("Class {} has no students.", class_id.trim()))
                        .await?;
                    return Ok(());
                }
                let mut text = format!("**Class {} ({} students)**\n", class_id.trim(), roster.len());
                for s in &roster {
                    writeln!(&mut text, "• {}", describe(s))?;
                }
                say_long(ctx, &text).await
            }
            (None, None) => {
                ctx.say("❌ Give a student id or a class id.").await?;
                Ok(())
            }
        }
    }

    /// Parent command for teachers.
    #[poise::command(
        slash_command,
        subcommands("teacher_save", "teacher_active", "teacher_list")
    )]
    pub async fn teacher(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Teacher commands. Available subcommands:\n\
            `/teacher save` - Create or update a teacher\n\
            `/teacher active` - Activate or deactivate a teacher\n\
            `/teacher list` - List all teachers";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a teacher or updates its active flag.
    #[poise::command(slash_command, rename = "save")]
    pub async fn teacher_save(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Teacher id"] teacher_id: String,
        #[description = "Active (default true)"] active: Option<bool>,
    ) -> Result<()> {
        let stored =
            people::upsert_teacher(&ctx.data().database, &teacher_id, active.unwrap_or(true))
                .await?;
        ctx.say(format!("✅ Saved teacher {}", stored.teacher_id))
            .await?;
        Ok(())
    }

    /// Activates or deactivates an existing teacher.
    #[poise::command(slash_command, rename = "active")]
    pub async fn teacher_active(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Teacher id"] teacher_id: String,
        #[description = "Active"] active: bool,
    ) -> Result<()> {
        let stored = people::set_teacher_active(&ctx.data().database, &teacher_id, active).await?;
        let state = if stored.active { "active" } else { "inactive" };
        ctx.say(format!("✅ Teacher {} is now {state}", stored.teacher_id))
            .await?;
        Ok(())
    }

    /// Lists all teachers.
    #[poise::command(slash_command, rename = "list")]
    pub async fn teacher_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let teachers = people::list_teachers(&ctx.data().database).await?;
        if teachers.is_empty() {
            ctx.say("No teachers registered.").await?;
            return Ok(());
        }

        let mut text = String::from("**Teachers**\n");
        for t in &teachers {
            writeln!(
                &mut text,
                "• {}{}",
                t.teacher_id,
                if t.active { "" } else { " [inactive]" }
            )?;
        }
        say_long(ctx, &text).await
    }
}

// Re-export all commands
pub use inner::*;
