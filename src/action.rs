use log::debug;
use serde_json::{json, Map, Value};

use crate::component::{ActionDefinition, OutputSchema, Property, StaticOption};
use crate::http::{encode_path_segment, Context};
use crate::options::{self, OptionLookup};
use crate::params::{ParamError, Parameters};
use crate::types::{ErrorShape, Meta};

pub const ACTION_NAME: &str = "update_issue";

/// Declared schema of the update-issue action as the host's form and
/// validation layers consume it.
pub fn definition() -> ActionDefinition {
    ActionDefinition {
        name: ACTION_NAME,
        title: "Update Issue",
        description: "Update specific repository issue",
        properties: vec![
            Property::string(
                "repository",
                "Repository",
                "Repository of issue you want to update",
            )
            .required()
            .lookup(OptionLookup::Repositories),
            Property::string("issue", "Issue", "Issue to update")
                .required()
                .lookup(OptionLookup::Issues)
                .depends_on("repository"),
            Property::string("title", "Title", "New issue title"),
            Property::string("state", "State", "New issue state").static_options(vec![
                StaticOption {
                    label: "Open",
                    value: "open",
                },
                StaticOption {
                    label: "Closed",
                    value: "closed",
                },
            ]),
            Property::string(
                "milestone",
                "Milestone",
                "Change issue milestone or remove it by passing in the null",
            )
            .lookup(OptionLookup::Milestones)
            .depends_on("repository"),
            Property::string_array("labels", "Labels", "Change issue labels")
                .lookup(OptionLookup::Labels)
                .depends_on("repository"),
            Property::string_array("assignees", "Assignees", "Change issue assignees")
                .lookup(OptionLookup::Collaborators)
                .depends_on("repository"),
        ],
        output: OutputSchema { reference: "issue" },
    }
}

pub fn issue_path(owner: &str, repository: &str, issue: &str) -> String {
    format!(
        "/repos/{}/{}/issues/{}",
        encode_path_segment(owner),
        encode_path_segment(repository),
        encode_path_segment(issue)
    )
}

/// Build the PATCH body. All five optional fields are always transmitted;
/// a field the caller left out (or set to null) goes out as JSON null,
/// which the upstream API reads as "clear" where clearing applies. The
/// empty-string milestone is the "No milestone" option and also clears.
pub fn request_body(params: &Parameters) -> Result<Value, ParamError> {
    let mut body = Map::new();
    body.insert(
        "title".into(),
        params
            .opt_str("title")?
            .map_or(Value::Null, |s| Value::String(s.to_string())),
    );
    body.insert(
        "state".into(),
        params
            .opt_str("state")?
            .map_or(Value::Null, |s| Value::String(s.to_string())),
    );
    let milestone = match params.opt_str("milestone")? {
        None | Some("") => Value::Null,
        Some(s) => Value::String(s.to_string()),
    };
    body.insert("milestone".into(), milestone);
    body.insert(
        "labels".into(),
        params.opt_str_array("labels")?.map_or(Value::Null, |v| json!(v)),
    );
    body.insert(
        "assignees".into(),
        params
            .opt_str_array("assignees")?
            .map_or(Value::Null, |v| json!(v)),
    );
    Ok(Value::Object(body))
}

fn param_error(e: ParamError) -> ErrorShape {
    let code = match e {
        ParamError::MissingParameter(_) => "missing_parameter",
        _ => "bad_request",
    };
    ErrorShape {
        code: code.into(),
        message: e.to_string(),
        retriable: false,
    }
}

/// Perform the update: resolve the owner, PATCH the issue, hand back the
/// upstream issue object untouched. Transport failures and non-2xx
/// statuses arrive pre-mapped from the execution context and are
/// propagated without local recovery.
pub async fn perform(
    ctx: &Context,
    params: &Parameters,
) -> (Option<Map<String, Value>>, Meta, Option<ErrorShape>) {
    let (repository, issue, body) = match (|| {
        let repository = params.required_str("repository")?.to_string();
        let issue = params.required_str("issue")?.to_string();
        let body = request_body(params)?;
        Ok::<_, ParamError>((repository, issue, body))
    })() {
        Ok(parts) => parts,
        Err(e) => return (None, Meta::default(), Some(param_error(e))),
    };

    let owner = match options::owner_login(ctx).await {
        Ok(login) => login,
        Err(e) => return (None, Meta::default(), Some(e)),
    };

    let path = issue_path(&owner, &repository, &issue);
    debug!("update_issue PATCH {}", path);
    let res = ctx.patch_json::<Value, Map<String, Value>>(&path, &body).await;
    let meta = Meta { rate: res.rate };
    if let Some(err) = res.error {
        return (None, meta, Some(err.into()));
    }
    (res.value, meta, None)
}
