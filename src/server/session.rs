use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::{header, HeaderMap};
use snaptext::ocr::Language;

/// Most recent successful recognition for one session, shown on the landing page.
#[derive(Debug, Clone)]
pub struct LastResult {
    pub artifact_name: String,
    pub lang: Language,
    pub text: String,
    pub at: String,
}

#[derive(Debug, Clone, Default)]
struct SessionData {
    flashes: Vec<String>,
    last: Option<LastResult>,
}

/// In-memory session store keyed by the opaque `sid` cookie. The only state
/// shared across requests, and each entry belongs to a single session.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl SessionStore {
    pub fn flash(&self, sid: &str, message: impl Into<String>) {
        let mut sessions = self.inner.write().unwrap();
        sessions
            .entry(sid.to_string())
            .or_default()
            .flashes
            .push(message.into());
    }

    /// Flash messages are shown once, then dropped. Entries left with no
    /// state are evicted so the map does not grow with every session ever seen.
    pub fn take_flashes(&self, sid: &str) -> Vec<String> {
        let mut sessions = self.inner.write().unwrap();
        let Some(data) = sessions.get_mut(sid) else {
            return Vec::new();
        };
        let flashes = std::mem::take(&mut data.flashes);
        if data.last.is_none() {
            sessions.remove(sid);
        }
        flashes
    }

    pub fn set_last(&self, sid: &str, last: LastResult) {
        let mut sessions = self.inner.write().unwrap();
        sessions.entry(sid.to_string()).or_default().last = Some(last);
    }

    pub fn last(&self, sid: &str) -> Option<LastResult> {
        let sessions = self.inner.read().unwrap();
        sessions.get(sid).and_then(|data| data.last.clone())
    }

    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.inner.read().unwrap().len()
    }
}

/// Pull the session id out of the Cookie header, if the client sent one.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "sid" && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn flashes_are_drained_on_read() {
        let store = SessionStore::default();
        store.flash("s1", "first");
        store.flash("s1", "second");

        assert_eq!(store.take_flashes("s1"), vec!["first", "second"]);
        assert!(store.take_flashes("s1").is_empty());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::default();
        store.flash("s1", "for s1");
        store.set_last(
            "s1",
            LastResult {
                artifact_name: "a.txt".into(),
                lang: Language::Eng,
                text: "hello".into(),
                at: "2024-01-01 00:00:00".into(),
            },
        );

        assert!(store.take_flashes("s2").is_empty());
        assert!(store.last("s2").is_none());
        assert_eq!(store.last("s1").unwrap().artifact_name, "a.txt");
    }

    #[test]
    fn drained_sessions_are_evicted() {
        let store = SessionStore::default();
        store.flash("s1", "one-shot message");
        assert_eq!(store.session_count(), 1);

        store.take_flashes("s1");
        assert_eq!(store.session_count(), 0);
        // draining an unknown session allocates nothing
        store.take_flashes("s2");
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn sessions_with_a_last_result_survive_draining() {
        let store = SessionStore::default();
        store.flash("s1", "message");
        store.set_last(
            "s1",
            LastResult {
                artifact_name: "a.txt".into(),
                lang: Language::Eng,
                text: "hello".into(),
                at: "2024-01-01 00:00:00".into(),
            },
        );

        store.take_flashes("s1");
        assert_eq!(store.session_count(), 1);
        assert!(store.last("s1").is_some());
    }

    #[test]
    fn parses_sid_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc123; other=1"),
        );
        assert_eq!(session_id_from_headers(&headers), Some("abc123".into()));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_id_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sid="));
        assert_eq!(session_id_from_headers(&headers), None);
    }
}
