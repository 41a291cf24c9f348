//! GitHub release source, adapted from the teacher's `github.rs`: a single `block_on` call
//! around octocrab's async client, a bearer token read from `$GITHUB_TOKEN` when present.

use std::env::{self, VarError};
use std::error::Error as _;
use std::io::Read;

use http::StatusCode;
use log::{debug, trace};
use octocrab::models::repos::Release as ReleaseModel;
use octocrab::{Error, OctocrabBuilder};
use reqwest::blocking::Client;
use tokio::runtime::Runtime;

use crate::core::GenericResult;
use crate::download::USER_AGENT;
use crate::provider::{Release, ReleaseAsset, ReleaseSource, AssetSource};

pub struct GitHub {
    client: Client,
}

impl GitHub {
    pub fn new() -> GenericResult<GitHub> {
        Ok(GitHub {
            client: Client::builder().user_agent(USER_AGENT).build()?,
        })
    }
}

impl ReleaseSource for GitHub {
    fn name(&self) -> &'static str {
        "github"
    }

    fn get_release(&self, owner: &str, repo: &str, version: Option<&str>) -> GenericResult<Release> {
        create_runtime()?.block_on(get_release_async(owner, repo, version))
    }
}

impl AssetSource for GitHub {
    fn open(&self, asset: &ReleaseAsset) -> GenericResult<Box<dyn Read>> {
        let response = self.client.get(&asset.url).send()?.error_for_status()?;
        Ok(Box::new(response))
    }
}

async fn get_release_async(owner: &str, repo: &str, version: Option<&str>) -> GenericResult<Release> {
    let mut builder = OctocrabBuilder::new();
    if let Some(token) = get_token()? {
        builder = builder.user_access_token(token);
    }

    let github = builder.build()?;
    let repository = github.repos(owner, repo);
    let project = format!("{owner}/{repo}");

    debug!("Getting {project} release info...");

    let release = match version {
        Some(tag) => {
            let alternate = if let Some(stripped) = tag.strip_prefix('v') {
                stripped.to_owned()
            } else {
                format!("v{tag}")
            };

            match repository.releases().get_by_tag(tag).await {
                Ok(release) => release,
                Err(Error::GitHub {source, ..}) if source.status_code == StatusCode::NOT_FOUND => {
                    repository.releases().get_by_tag(&alternate).await.map_err(|err| match err {
                        Error::GitHub {source, ..} if source.status_code == StatusCode::NOT_FOUND =>
                            format!("{project}@{tag}: no such release").into(),
                        _ => humanize_error(err),
                    })?
                },
                Err(err) => return Err(humanize_error(err)),
            }
        },
        None => {
            let latest = repository.releases().get_latest().await
                .map(Some)
                .or_else(|err| -> GenericResult<Option<ReleaseModel>> {
                    match err {
                        Error::GitHub {source, ..} if source.status_code == StatusCode::NOT_FOUND => Ok(None),
                        _ => Err!("{}", humanize_error(err)),
                    }
                })?;

            match latest {
                Some(release) => release,
                None => {
                    repository.get().await.map_err(|err| match err {
                        Error::GitHub {source, ..} if source.status_code == StatusCode::NOT_FOUND =>
                            "the project doesn't exist".into(),
                        _ => humanize_error(err),
                    })?;
                    return Err!("{project} has no releases");
                },
            }
        },
    };

    trace!("The {project} release:\n{release:#?}");

    Ok(Release {
        tag: release.tag_name,
        assets: release.assets.into_iter().map(|asset| ReleaseAsset {
            name: asset.name,
            url: asset.browser_download_url.to_string(),
        }).collect(),
    })
}

fn create_runtime() -> GenericResult<Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread().enable_all().build()
        .map_err(|e| format!("failed to create tokio runtime: {e}"))?)
}

fn get_token() -> GenericResult<Option<String>> {
    const VAR_NAME: &str = "GITHUB_TOKEN";

    Ok(match env::var(VAR_NAME) {
        Ok(token) => {
            debug!("Using GitHub token from {VAR_NAME} environment variable.");
            Some(token)
        },
        Err(VarError::NotPresent) => None,
        Err(err) => return Err!("{VAR_NAME} environment variable has an invalid value: {err}"),
    })
}

// octocrab errors are very human-unfriendly
fn humanize_error(err: Error) -> crate::core::GenericError {
    let mut message = String::new();
    let mut source = err.source();

    while let Some(inner) = source {
        if message.is_empty() {
            message = inner.to_string();
        } else {
            let inner_message = inner.to_string();
            if message.ends_with(&inner_message) {
                break;
            }
            message = format!("{message}: {inner_message}");
        }
        source = inner.source();
    }

    if message.is_empty() {
        message = err.to_string();
    }

    message.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_source_name_is_stable() {
        let github = GitHub::new().unwrap();
        assert_eq!(github.name(), "github");
    }
}
