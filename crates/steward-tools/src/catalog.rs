//! Builtin action catalog.
//!
//! The tools this backend fronts out of the box. Each definition carries the
//! provider capability key the connector lookups resolve against.

use crate::definition::{ParameterSpec, ParameterType, ToolCategory, ToolDefinition};

/// All builtin tool definitions.
#[must_use]
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        send_email(),
        create_calendar_event(),
        query_crm_records(),
        update_crm_record(),
        search_contacts(),
    ]
}

fn send_email() -> ToolDefinition {
    ToolDefinition::new(
        "send_email",
        "Send an email on the user's behalf",
        ToolCategory::Email,
        "gmail",
    )
    .with_parameter(ParameterSpec::required(
        "to",
        ParameterType::String,
        "Who should receive the email?",
    ))
    .with_parameter(ParameterSpec::required(
        "subject",
        ParameterType::String,
        "What is the subject line?",
    ))
    .with_parameter(ParameterSpec::required_unless(
        "body",
        ParameterType::String,
        "What should the email say?",
        "template_id",
    ))
    .with_parameter(ParameterSpec::optional(
        "template_id",
        ParameterType::String,
        "Saved template to send instead of a body",
    ))
}

fn create_calendar_event() -> ToolDefinition {
    ToolDefinition::new(
        "create_calendar_event",
        "Create a calendar event",
        ToolCategory::Calendar,
        "google_calendar",
    )
    .with_parameter(ParameterSpec::required(
        "title",
        ParameterType::String,
        "What is the event called?",
    ))
    .with_parameter(
        ParameterSpec::required(
            "start_time",
            ParameterType::String,
            "When does it start?",
        )
        .with_hint("ISO 8601"),
    )
    .with_parameter(
        ParameterSpec::optional("end_time", ParameterType::String, "When does it end?")
            .with_hint("ISO 8601"),
    )
    .with_parameter(ParameterSpec::required_unless(
        "attendees",
        ParameterType::Array,
        "Who should be invited?",
        "contact_id",
    ))
    .with_parameter(ParameterSpec::optional(
        "contact_id",
        ParameterType::String,
        "CRM contact to invite instead of an attendee list",
    ))
}

fn query_crm_records() -> ToolDefinition {
    ToolDefinition::new(
        "query_crm_records",
        "Query CRM records with optional paging, filters, and a date range",
        ToolCategory::Crm,
        "salesforce",
    )
    .with_parameter(ParameterSpec::required(
        "object_type",
        ParameterType::String,
        "Which record type?",
    ))
    .with_parameter(
        ParameterSpec::optional("page_size", ParameterType::Number, "Records per page")
            .with_hint("clamped to the configured bounds"),
    )
    .with_parameter(ParameterSpec::optional(
        "filters",
        ParameterType::Object,
        "Field filters to apply",
    ))
    .with_parameter(
        ParameterSpec::optional("start_date", ParameterType::String, "Earliest record date")
            .with_hint("ISO 8601 or YYYY-MM-DD"),
    )
    .with_parameter(
        ParameterSpec::optional("end_date", ParameterType::String, "Latest record date")
            .with_hint("ISO 8601 or YYYY-MM-DD"),
    )
}

fn update_crm_record() -> ToolDefinition {
    ToolDefinition::new(
        "update_crm_record",
        "Update fields on an existing CRM record",
        ToolCategory::Crm,
        "salesforce",
    )
    .with_parameter(ParameterSpec::required(
        "object_type",
        ParameterType::String,
        "Which record type?",
    ))
    .with_parameter(ParameterSpec::required(
        "record_id",
        ParameterType::String,
        "Which record?",
    ))
    .with_parameter(ParameterSpec::required(
        "fields",
        ParameterType::Object,
        "Fields to update",
    ))
}

fn search_contacts() -> ToolDefinition {
    ToolDefinition::new(
        "search_contacts",
        "Search contacts by name, email, or company",
        ToolCategory::Contacts,
        "salesforce",
    )
    .with_parameter(ParameterSpec::required(
        "query",
        ParameterType::String,
        "Who are you looking for?",
    ))
    .with_parameter(ParameterSpec::optional(
        "limit",
        ParameterType::Number,
        "Maximum matches to return",
    ))
}
