use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::{catalog::REQUEST_TIMEOUT, renamer::RunSummary};

const USERNAME: &str = "posterarr";
const COLOR_LIVE: u32 = 0x2e_cc71;
const COLOR_DRY_RUN: u32 = 0xf1_c40f;

/// Posts run summaries to a Discord webhook.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook: String,
}

impl DiscordNotifier {
    pub fn new(webhook: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            webhook: webhook.to_string(),
        })
    }

    pub async fn send(&self, summary: &RunSummary) -> Result<()> {
        self.client
            .post(&self.webhook)
            .json(&payload(summary))
            .send()
            .await
            .context("Failed to reach Discord webhook")?
            .error_for_status()
            .context("Discord rejected the notification")?;
        Ok(())
    }
}

fn field(name: &str, value: usize) -> Value {
    json!({ "name": name, "value": value.to_string(), "inline": true })
}

pub fn payload(summary: &RunSummary) -> Value {
    let (title, color) = if summary.dry_run {
        ("Renamer (dry run)", COLOR_DRY_RUN)
    } else {
        ("Renamer", COLOR_LIVE)
    };
    json!({
        "username": USERNAME,
        "embeds": [{
            "title": title,
            "color": color,
            "fields": [
                field("Movies", summary.placed("Movie")),
                field("Series", summary.placed("Series")),
                field("Collections", summary.placed("Collection")),
                field("Near misses", summary.near_misses()),
                field("Unmatched", summary.unmatched()),
                field("Errors", summary.failed()),
            ],
        }],
    })
}
