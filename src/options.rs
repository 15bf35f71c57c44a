use serde::{Deserialize, Serialize};

use crate::http::{encode_path_segment, has_next_page_from_link, Context, RateMeta};
use crate::types::{ErrorShape, OptionItem};

const PER_PAGE: u32 = 100;
// Option lists are for interactive selection; cap the crawl rather than
// walking arbitrarily large accounts.
const MAX_PAGES: u32 = 10;

/// Dynamic option sources a property can declare. The host's resolution
/// pipeline invokes [`OptionLookup::resolve`] with the currently selected
/// repository; the action's perform path never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionLookup {
    Repositories,
    Issues,
    Milestones,
    Labels,
    Collaborators,
}

impl OptionLookup {
    pub async fn resolve(
        self,
        ctx: &Context,
        repository: Option<&str>,
    ) -> Result<(Vec<OptionItem>, Option<RateMeta>), ErrorShape> {
        match self {
            OptionLookup::Repositories => repository_options(ctx).await,
            OptionLookup::Issues => issue_options(ctx, require_repo(repository)?).await,
            OptionLookup::Milestones => milestone_options(ctx, require_repo(repository)?).await,
            OptionLookup::Labels => label_options(ctx, require_repo(repository)?).await,
            OptionLookup::Collaborators => {
                collaborator_options(ctx, require_repo(repository)?).await
            }
        }
    }
}

fn require_repo(repository: Option<&str>) -> Result<&str, ErrorShape> {
    match repository {
        Some(r) if !r.is_empty() => Ok(r),
        _ => Err(ErrorShape {
            code: "bad_request".into(),
            message: "option lookup requires a selected repository".into(),
            retriable: false,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct Viewer {
    login: String,
}

/// Login of the connected account; the owner segment of every repository
/// path.
pub async fn owner_login(ctx: &Context) -> Result<String, ErrorShape> {
    let res = ctx.get_json::<Viewer>("/user").await;
    if let Some(err) = res.error {
        return Err(err.into());
    }
    match res.value {
        Some(v) => Ok(v.login),
        None => Err(ErrorShape {
            code: "server_error".into(),
            message: "empty /user response".into(),
            retriable: false,
        }),
    }
}

fn repo_path(owner: &str, repository: &str, tail: &str) -> String {
    format!(
        "/repos/{}/{}/{}",
        encode_path_segment(owner),
        encode_path_segment(repository),
        tail
    )
}

// Walk a paginated listing, following the Link header up to MAX_PAGES.
// Returns the concatenated records plus the rate meta of the last page.
async fn fetch_all_pages<T: for<'de> Deserialize<'de>>(
    ctx: &Context,
    base_path: &str,
) -> Result<(Vec<T>, Option<RateMeta>), ErrorShape> {
    let mut records = Vec::new();
    let mut rate = None;
    let mut page = 1u32;
    loop {
        let path = format!("{}?per_page={}&page={}", base_path, PER_PAGE, page);
        let res = ctx.get_json::<Vec<T>>(&path).await;
        if let Some(err) = res.error {
            return Err(err.into());
        }
        rate = res.rate;
        if let Some(items) = res.value {
            records.extend(items);
        }
        let more = res
            .headers
            .as_ref()
            .map(has_next_page_from_link)
            .unwrap_or(false);
        if !more || page >= MAX_PAGES {
            break;
        }
        page += 1;
    }
    Ok((records, rate))
}

#[derive(Debug, Deserialize)]
struct RepoRecord {
    name: String,
}

pub async fn repository_options(
    ctx: &Context,
) -> Result<(Vec<OptionItem>, Option<RateMeta>), ErrorShape> {
    let (records, rate) = fetch_all_pages::<RepoRecord>(ctx, "/user/repos").await?;
    let options = records
        .into_iter()
        .map(|r| OptionItem::new(r.name.clone(), r.name))
        .collect();
    Ok((options, rate))
}

#[derive(Debug, Deserialize)]
struct IssueRecord {
    number: i64,
    title: String,
    // The issues listing interleaves pull requests; they carry this key.
    pull_request: Option<serde_json::Value>,
}

pub async fn issue_options(
    ctx: &Context,
    repository: &str,
) -> Result<(Vec<OptionItem>, Option<RateMeta>), ErrorShape> {
    let owner = owner_login(ctx).await?;
    let path = repo_path(&owner, repository, "issues");
    let (records, rate) = fetch_all_pages::<IssueRecord>(ctx, &path).await?;
    let options = records
        .into_iter()
        .filter(|r| r.pull_request.is_none())
        .map(|r| OptionItem::new(format!("#{} {}", r.number, r.title), r.number.to_string()))
        .collect();
    Ok((options, rate))
}

#[derive(Debug, Deserialize)]
struct MilestoneRecord {
    number: i64,
    title: String,
}

pub async fn milestone_options(
    ctx: &Context,
    repository: &str,
) -> Result<(Vec<OptionItem>, Option<RateMeta>), ErrorShape> {
    let owner = owner_login(ctx).await?;
    let path = repo_path(&owner, repository, "milestones");
    let (records, rate) = fetch_all_pages::<MilestoneRecord>(ctx, &path).await?;
    // The empty value is the "remove milestone" signal; perform turns it
    // into a transmitted null.
    let mut options = vec![OptionItem::new("No milestone", "")];
    options.extend(
        records
            .into_iter()
            .map(|r| OptionItem::new(r.title, r.number.to_string())),
    );
    Ok((options, rate))
}

#[derive(Debug, Deserialize)]
struct LabelRecord {
    name: String,
}

pub async fn label_options(
    ctx: &Context,
    repository: &str,
) -> Result<(Vec<OptionItem>, Option<RateMeta>), ErrorShape> {
    let owner = owner_login(ctx).await?;
    let path = repo_path(&owner, repository, "labels");
    let (records, rate) = fetch_all_pages::<LabelRecord>(ctx, &path).await?;
    let options = records
        .into_iter()
        .map(|r| OptionItem::new(r.name.clone(), r.name))
        .collect();
    Ok((options, rate))
}

#[derive(Debug, Deserialize)]
struct CollaboratorRecord {
    login: String,
}

pub async fn collaborator_options(
    ctx: &Context,
    repository: &str,
) -> Result<(Vec<OptionItem>, Option<RateMeta>), ErrorShape> {
    let owner = owner_login(ctx).await?;
    let path = repo_path(&owner, repository, "collaborators");
    let (records, rate) = fetch_all_pages::<CollaboratorRecord>(ctx, &path).await?;
    let options = records
        .into_iter()
        .map(|r| OptionItem::new(r.login.clone(), r.login))
        .collect();
    Ok((options, rate))
}
