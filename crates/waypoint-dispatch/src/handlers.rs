//! Built-in workflow handlers.
//!
//! These are the stock implementations wired to the code paths the
//! routing artifact uses.  They are deliberately mocked: each returns a
//! deterministic payload derived from its context so the pipeline can be
//! exercised end-to-end while the real integrations land one by one.

use serde_json::{Value, json};

use crate::error::DispatchResult;
use crate::registry::WorkflowRegistry;
use crate::workflow::WorkflowContext;

/// Register every built-in handler on the given registry.
pub fn register_builtin_workflows(registry: &WorkflowRegistry) {
    registry.register_fn("workflows/interact/chat", |ctx| async move {
        chat_response(&ctx)
    });
    registry.register_fn("workflows/create/task", |ctx| async move {
        create_task(&ctx)
    });
    registry.register_fn("workflows/create/content_draft", |ctx| async move {
        content_draft(&ctx)
    });
    registry.register_fn("workflows/summarize/daily_digest", |ctx| async move {
        daily_digest(&ctx)
    });
    registry.register_fn("workflows/automation/voice_to_anywhere", |ctx| async move {
        voice_to_anywhere(&ctx)
    });
    registry.register_fn("workflows/automation/attach_image", |ctx| async move {
        attach_image(&ctx)
    });
    registry.register_fn("workflows/automation/content_repurpose", |ctx| async move {
        content_repurpose(&ctx)
    });
    registry.register_fn("workflows/schedule/reschedule_meeting", |ctx| async move {
        reschedule_meeting(&ctx)
    });
}

/// Free-form conversation fallback: echo back an acknowledgement.
fn chat_response(ctx: &WorkflowContext) -> DispatchResult<Value> {
    Ok(json!({
        "reply": format!("I heard: {}", ctx.input),
        "is_fallback": ctx.is_fallback,
    }))
}

/// Create a task entry titled after the user's input.
fn create_task(ctx: &WorkflowContext) -> DispatchResult<Value> {
    Ok(json!({
        "task": {
            "title": ctx.input,
            "status": "todo",
            "source_intent": ctx.intent,
            "created_at": ctx.timestamp.to_rfc3339(),
        }
    }))
}

/// Draft a content outline from the prompt.
fn content_draft(ctx: &WorkflowContext) -> DispatchResult<Value> {
    Ok(json!({
        "draft": {
            "topic": ctx.input,
            "sections": ["hook", "body", "call to action"],
        }
    }))
}

/// Summarize the day's captured intents.
fn daily_digest(ctx: &WorkflowContext) -> DispatchResult<Value> {
    Ok(json!({
        "digest": {
            "date": ctx.timestamp.date_naive().to_string(),
            "highlights": [],
            "requested_by": ctx.options.get("user_id").cloned().unwrap_or(Value::Null),
        }
    }))
}

/// Capture a voice note and file it at a destination.
fn voice_to_anywhere(ctx: &WorkflowContext) -> DispatchResult<Value> {
    Ok(json!({
        "transcribed_text": "This is a transcribed note.",
        "destination": ctx.options.get("destination").cloned().unwrap_or(json!("note")),
        "source": ctx.input,
    }))
}

/// Attach an image to an existing post.
fn attach_image(ctx: &WorkflowContext) -> DispatchResult<Value> {
    Ok(json!({
        "attached": true,
        "post_id": ctx.options.get("post_id").cloned().unwrap_or(Value::Null),
        "image_url": ctx.options.get("image_url").cloned().unwrap_or(Value::Null),
    }))
}

/// Repurpose existing content into a new format.
fn content_repurpose(ctx: &WorkflowContext) -> DispatchResult<Value> {
    let target = ctx
        .options
        .get("target_format")
        .and_then(Value::as_str)
        .unwrap_or("thread");
    Ok(json!({
        "repurposed": format!("Transformed content to format {target}"),
        "source": ctx.input,
    }))
}

/// Move a meeting to a new time.
fn reschedule_meeting(ctx: &WorkflowContext) -> DispatchResult<Value> {
    Ok(json!({
        "rescheduled": true,
        "meeting_id": ctx.options.get("meeting_id").cloned().unwrap_or(Value::Null),
        "new_time": ctx.options.get("new_time").cloned().unwrap_or(Value::Null),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use waypoint_routing::{RoutingRule, RulePaths};

    fn ctx_for(intent: &str, input: &str) -> WorkflowContext {
        let mut parts = intent.splitn(2, '.');
        let category = parts.next().unwrap_or_default().to_string();
        let rule = RoutingRule {
            category: category.clone(),
            title: intent.to_string(),
            description: String::new(),
            priority: 50,
            enabled: true,
            triggers: vec![],
            examples: vec![],
            paths: RulePaths {
                code: format!("workflows/{category}/test"),
                scenario: None,
            },
        };
        let mut ctx = WorkflowContext::direct(intent, rule, Map::new());
        ctx.input = input.to_string();
        ctx
    }

    #[test]
    fn builtin_registration_covers_all_paths() {
        let registry = WorkflowRegistry::new();
        register_builtin_workflows(&registry);

        for path in [
            "workflows/interact/chat",
            "workflows/create/task",
            "workflows/create/content_draft",
            "workflows/summarize/daily_digest",
            "workflows/automation/voice_to_anywhere",
            "workflows/automation/attach_image",
            "workflows/automation/content_repurpose",
            "workflows/schedule/reschedule_meeting",
        ] {
            assert!(registry.contains(path), "missing handler for {path}");
        }
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn chat_response_echoes_input() {
        let ctx = ctx_for("interact.chat", "hello there");
        let out = chat_response(&ctx).unwrap();
        assert_eq!(out["reply"], json!("I heard: hello there"));
    }

    #[test]
    fn create_task_titles_after_input() {
        let ctx = ctx_for("create.task", "buy milk");
        let out = create_task(&ctx).unwrap();
        assert_eq!(out["task"]["title"], json!("buy milk"));
        assert_eq!(out["task"]["status"], json!("todo"));
    }

    #[test]
    fn voice_to_anywhere_defaults_destination() {
        let ctx = ctx_for("automation.voice_to_anywhere", "record this idea");
        let out = voice_to_anywhere(&ctx).unwrap();
        assert_eq!(out["destination"], json!("note"));
        assert_eq!(out["transcribed_text"], json!("This is a transcribed note."));
    }

    #[test]
    fn content_repurpose_reads_target_format() {
        let mut ctx = ctx_for("automation.content_repurpose", "my blog post");
        ctx.options
            .insert("target_format".to_string(), json!("newsletter"));
        let out = content_repurpose(&ctx).unwrap();
        assert_eq!(
            out["repurposed"],
            json!("Transformed content to format newsletter")
        );
    }

    #[test]
    fn reschedule_meeting_carries_options() {
        let mut ctx = ctx_for("schedule.reschedule_meeting", "move standup");
        ctx.options.insert("meeting_id".to_string(), json!("m-7"));
        ctx.options.insert("new_time".to_string(), json!("15:00"));
        let out = reschedule_meeting(&ctx).unwrap();
        assert_eq!(out["meeting_id"], json!("m-7"));
        assert_eq!(out["new_time"], json!("15:00"));
    }
}
