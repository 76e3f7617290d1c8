//! Subscription URL variants for the calendar feed.

use url::Url;

use crate::error::{FeedError, FeedResult};

const GOOGLE_CALENDAR_RENDER_URL: &str = "http://www.google.com/calendar/render";

/// The three ways to subscribe to the same feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUrls {
    /// Plain download link; `https` is kept, anything else becomes `http`
    pub http: String,
    /// Same location under the `webcal` scheme
    pub webcal: String,
    /// Google Calendar "add by URL" link with the webcal URL as `cid`
    pub google: String,
}

impl SubscriptionUrls {
    pub fn from_ics_url(ics_url: &str) -> FeedResult<Self> {
        let parsed = Url::parse(ics_url).map_err(|e| FeedError::InvalidUrl {
            url: ics_url.to_string(),
            reason: e.to_string(),
        })?;

        let http_scheme = if parsed.scheme() == "https" {
            "https"
        } else {
            "http"
        };
        let http = with_scheme(&parsed, http_scheme);
        let webcal = with_scheme(&parsed, "webcal");

        let google = Url::parse_with_params(GOOGLE_CALENDAR_RENDER_URL, &[("cid", &webcal)])
            .map_err(|e| FeedError::InvalidUrl {
                url: GOOGLE_CALENDAR_RENDER_URL.to_string(),
                reason: e.to_string(),
            })?
            .to_string();

        Ok(SubscriptionUrls {
            http,
            webcal,
            google,
        })
    }
}

/// Swap the scheme textually. `Url::set_scheme` refuses to move between
/// special schemes like `http` and non-special ones like `webcal`.
fn with_scheme(url: &Url, scheme: &str) -> String {
    let rest = &url.as_str()[url.scheme().len()..];
    format!("{scheme}{rest}")
}
