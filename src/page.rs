//! Static-HTML implementation of [`PageDriver`].
//!
//! `navigate` fetches the page body; `wait_for` looks for the first element
//! matching a CSS selector and re-fetches the page until the element shows
//! up or the wait budget runs out. Pages that only render the element from
//! script need a real browser behind the same trait.

use scraper::{Html, Selector};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::PageError;
use crate::http::{build_agent, is_io_timeout};
use crate::source::PageDriver;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|_| PageError::InvalidSelector(selector.to_string()))
}

/// Text content of the first element matching `selector`, entities decoded
/// and nested markup flattened.
pub fn find_text(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(selector).next()?;
    Some(element.text().collect::<String>().trim().to_string())
}

pub struct HttpPageDriver {
    agent: ureq::Agent,
    current_url: Option<String>,
    body: String,
    poll_interval: Duration,
}

impl HttpPageDriver {
    /// `request_timeout` bounds each page load.
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            agent: build_agent(request_timeout),
            current_url: None,
            body: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fetch `url`; `budget` caps this request below the agent timeout.
    fn fetch(&self, url: &str, budget: Option<Duration>) -> Result<String, PageError> {
        let navigation = |reason: String| PageError::Navigation {
            url: url.to_string(),
            reason,
        };
        let mut request = self.agent.get(url);
        if let Some(budget) = budget {
            request = request.timeout(budget);
        }
        let response = request.call().map_err(|e| navigation(e.to_string()))?;
        response.into_string().map_err(|e| {
            if is_io_timeout(&e) {
                navigation("timed out reading body".to_string())
            } else {
                navigation(e.to_string())
            }
        })
    }
}

impl PageDriver for HttpPageDriver {
    fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        self.body.clear();
        self.current_url = None;
        self.body = self.fetch(url, None)?;
        self.current_url = Some(url.to_string());
        Ok(())
    }

    /// Never runs past `timeout`: each re-fetch only gets what is left of it.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<String, PageError> {
        let parsed = parse_selector(selector)?;
        let url = self
            .current_url
            .clone()
            .ok_or_else(|| PageError::Other("wait_for called before navigate".to_string()))?;
        let deadline = Instant::now() + timeout;
        let expired = || PageError::Timeout {
            selector: selector.to_string(),
            timeout,
        };

        loop {
            if let Some(text) = find_text(&self.body, &parsed) {
                return Ok(text);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(expired());
            }
            thread::sleep(self.poll_interval.min(deadline - now));

            let now = Instant::now();
            if now >= deadline {
                return Err(expired());
            }
            match self.fetch(&url, Some(deadline - now)) {
                Ok(body) => self.body = body,
                Err(e) => debug!("Re-fetch while waiting failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    const PAGE: &str = r#"<html><body>
        <div class="header"><h1 data-testid="entityTitle">Song</h1></div>
        <span class="x" data-testid="playcount" dir="auto">1&nbsp;234&nbsp;567</span>
    </body></html>"#;

    fn text(html: &str, selector: &str) -> Option<String> {
        find_text(html, &parse_selector(selector).unwrap())
    }

    #[test]
    fn test_finds_element_text() {
        assert_eq!(
            text(PAGE, r#"[data-testid="playcount"]"#).as_deref(),
            Some("1\u{a0}234\u{a0}567")
        );
        assert_eq!(text(PAGE, "[data-testid='entityTitle']").as_deref(), Some("Song"));
        assert_eq!(text(PAGE, r#"[data-testid="play"]"#), None);
    }

    #[test]
    fn test_nested_markup_is_flattened() {
        let html = r#"<div data-testid="playcount"><span>1&nbsp;234</span></div>"#;
        assert_eq!(
            text(html, r#"[data-testid="playcount"]"#).as_deref(),
            Some("1\u{a0}234")
        );
    }

    #[test]
    fn test_numeric_entities_are_decoded() {
        let html = r#"<span data-testid="playcount">1&#8239;234&#x202F;567</span>"#;
        assert_eq!(
            text(html, r#"[data-testid="playcount"]"#).as_deref(),
            Some("1\u{202f}234\u{202f}567")
        );
    }

    #[test]
    fn test_invalid_selector() {
        for selector in ["[data-testid=", "div >", "#"] {
            assert!(matches!(
                parse_selector(selector),
                Err(PageError::InvalidSelector(_))
            ));
        }
    }

    #[test]
    fn test_wait_before_navigate_is_error() {
        let mut driver = HttpPageDriver::new(Duration::from_secs(1));
        let result = driver.wait_for(r#"[data-testid="playcount"]"#, Duration::from_millis(10));
        assert!(matches!(result, Err(PageError::Other(_))));
    }

    /// Local server: the first request is answered at once, every later one
    /// after `delay`. The page never contains the counter.
    fn slow_server(delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for (n, stream) in listener.incoming().flatten().enumerate() {
                let wait = if n == 0 { Duration::ZERO } else { delay };
                thread::spawn(move || respond(stream, wait));
            }
        });

        format!("http://{}/track/t1", addr)
    }

    fn respond(mut stream: TcpStream, delay: Duration) {
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf);
        thread::sleep(delay);
        let body = "<html><body><p>loading</p></body></html>";
        let _ = write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
    }

    #[test]
    fn test_wait_stays_within_timeout_when_refetch_is_slow() {
        let url = slow_server(Duration::from_millis(600));
        let timeout = Duration::from_secs(1);
        let mut driver =
            HttpPageDriver::new(timeout).with_poll_interval(Duration::from_millis(100));
        driver.navigate(&url).unwrap();

        let start = Instant::now();
        let result = driver.wait_for(r#"[data-testid="playcount"]"#, timeout);
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(PageError::Timeout { .. })));
        assert!(
            elapsed < timeout + Duration::from_millis(250),
            "wait took {:?}",
            elapsed
        );
    }
}
