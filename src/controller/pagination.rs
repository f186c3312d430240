//! Follows the controller's `next` links and flattens paginated collections.

use crate::controller::client::{ApiRequest, Transport};
use crate::controller::error::TransportError;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Upper bound on pages fetched for a single collection read.
pub const MAX_PAGES: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PageBody {
    Paged {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        results: Vec<serde_json::Value>,
    },
    Bare(Vec<serde_json::Value>),
}

/// A collection flattened across all pages that were read.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    /// Total reported by the controller, if any.
    pub count: Option<u64>,
    pub items: Vec<serde_json::Value>,
    /// True when `limit` cut the read short.
    pub truncated: bool,
}

/// Read `first` and every following page, preserving the controller's order.
///
/// Stops early once `limit` items are collected.
pub async fn collect_pages(
    transport: &dyn Transport,
    first: ApiRequest,
    limit: Option<usize>,
) -> Result<Collected, TransportError> {
    let mut items = Vec::new();
    let mut count = None;
    let mut seen = HashSet::new();
    let mut request = Some(first);
    let mut pages = 0usize;

    while let Some(req) = request.take() {
        pages += 1;
        let resp = transport.send(req).await?;

        let next = match resp.json::<PageBody>()? {
            PageBody::Paged {
                count: c,
                next,
                results,
            } => {
                if count.is_none() {
                    count = c;
                }
                items.extend(results);
                next
            }
            PageBody::Bare(results) => {
                items.extend(results);
                None
            }
        };

        if let Some(max) = limit {
            if items.len() >= max {
                let truncated = items.len() > max || next.is_some();
                items.truncate(max);
                debug!("Collected {} items (limit reached)", items.len());
                return Ok(Collected {
                    count,
                    items,
                    truncated,
                });
            }
        }

        match next.filter(|n| !n.is_empty()) {
            Some(link) if pages >= MAX_PAGES => {
                warn!("Stopping pagination after {} pages (next: {})", pages, link);
                return Ok(Collected {
                    count,
                    items,
                    truncated: true,
                });
            }
            Some(link) => {
                if !seen.insert(link.clone()) {
                    return Err(TransportError::InvalidResponse(format!(
                        "pagination loop at {link}"
                    )));
                }
                request = Some(ApiRequest::get(link));
            }
            None => {}
        }
    }

    debug!("Collected {} items over {} pages", items.len(), pages);
    Ok(Collected {
        count,
        items,
        truncated: false,
    })
}
