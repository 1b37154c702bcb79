//! Element resolution through per-platform fallback chains.
//!
//! Each platform defines an ordered list of (criterion, strategy) pairs,
//! highest-confidence first. A strategy is attempted only when its
//! criterion was recorded; the first live element wins and short-circuits
//! the rest of the chain. There is no retry and no backoff.

use thiserror::Error;

use super::traits::{AutomationSession, LiveElement, LocatorStrategy, ResolvedTarget, SessionError};
use crate::parser::types::{AndroidElement, ElementDescriptor, WindowsElement};

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no element matched the recorded criteria")]
    NotFound,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One rung of a fallback chain: attempted only when `criterion` is
/// non-empty.
struct Strategy<'a> {
    criterion: &'a str,
    locator: LocatorStrategy,
}

fn windows_chain(el: &WindowsElement) -> [Strategy<'_>; 3] {
    [
        Strategy {
            criterion: &el.accessibility_id,
            locator: LocatorStrategy::AccessibilityId,
        },
        Strategy {
            criterion: &el.xpath,
            locator: LocatorStrategy::Xpath,
        },
        Strategy {
            criterion: &el.text,
            locator: LocatorStrategy::Text,
        },
    ]
}

fn android_chain(el: &AndroidElement) -> [Strategy<'_>; 4] {
    [
        Strategy {
            criterion: &el.resource_id,
            locator: LocatorStrategy::ResourceId,
        },
        Strategy {
            criterion: &el.xpath,
            locator: LocatorStrategy::Xpath,
        },
        Strategy {
            criterion: &el.text,
            locator: LocatorStrategy::Text,
        },
        Strategy {
            criterion: &el.content_desc,
            locator: LocatorStrategy::ContentDescription,
        },
    ]
}

/// First match wins; exhaustion is `Ok(None)`.
async fn first_match(
    session: &dyn AutomationSession,
    chain: &[Strategy<'_>],
) -> Result<Option<LiveElement>, SessionError> {
    for strategy in chain {
        if strategy.criterion.is_empty() {
            continue;
        }
        if let Some(found) = session.find_element(strategy.locator, strategy.criterion).await? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Resolve a recorded descriptor against the live UI tree.
pub async fn locate(
    session: &dyn AutomationSession,
    descriptor: &ElementDescriptor,
) -> Result<ResolvedTarget, LocateError> {
    match descriptor {
        ElementDescriptor::Windows(el) => match first_match(session, &windows_chain(el)).await? {
            Some(found) => Ok(ResolvedTarget::Element(found)),
            None => Err(LocateError::NotFound),
        },
        ElementDescriptor::Android(el) => {
            if let Some(found) = first_match(session, &android_chain(el)).await? {
                return Ok(ResolvedTarget::Element(found));
            }
            // Last resort on Android: the geometric center captured at
            // recording time.
            if let (Some(x), Some(y)) = (el.center_x, el.center_y) {
                log::debug!("falling back to recorded center point ({x}, {y})");
                return Ok(ResolvedTarget::Point { x, y });
            }
            Err(LocateError::NotFound)
        }
        ElementDescriptor::None => Err(LocateError::NotFound),
    }
}
